#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub panel: Panel,
    pub mailer: Mailer,
    pub jobs: Jobs,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Mailer {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct Jobs {
    /// Days-remaining marks at which a renewal reminder goes out,
    /// largest first.
    pub reminder_thresholds: Vec<i32>,
    pub lookahead_days: i64,
    pub suspend_grace_days: i64,
    pub run_interval_secs: u64,
    pub internal_token: Option<String>,
}
