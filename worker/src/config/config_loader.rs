use anyhow::{Context, Result};

use super::config_model::{Database, DotEnvyConfig, Jobs, Mailer, Panel, WorkerServer};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: std::env::var("SERVER_PORT_WORKER")
            .expect("SERVER_PORT_WORKER is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let panel = Panel {
        base_url: std::env::var("PANEL_BASE_URL").expect("PANEL_BASE_URL is invalid"),
        api_key: std::env::var("PANEL_API_KEY").expect("PANEL_API_KEY is invalid"),
    };

    let mailer = Mailer {
        endpoint: std::env::var("MAILER_ENDPOINT").ok().and_then(|v| {
            let trimmed = v.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
        api_key: std::env::var("MAILER_API_KEY").ok(),
        sender: std::env::var("MAILER_SENDER")
            .unwrap_or_else(|_| "billing@blockhost.example".to_string()),
    };

    let reminder_thresholds = std::env::var("DAILY_JOB_REMINDER_THRESHOLDS")
        .unwrap_or_else(|_| "7,3,1".to_string())
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .context("DAILY_JOB_REMINDER_THRESHOLDS is invalid")
        })
        .collect::<Result<Vec<i32>>>()?;

    let jobs = Jobs {
        reminder_thresholds,
        lookahead_days: std::env::var("DAILY_JOB_LOOKAHEAD_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("DAILY_JOB_LOOKAHEAD_DAYS is invalid")?,
        suspend_grace_days: std::env::var("DAILY_JOB_SUSPEND_GRACE_DAYS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("DAILY_JOB_SUSPEND_GRACE_DAYS is invalid")?,
        run_interval_secs: std::env::var("DAILY_JOB_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .context("DAILY_JOB_INTERVAL_SECS is invalid")?,
        internal_token: std::env::var("INTERNAL_JOBS_TOKEN").ok().and_then(|v| {
            let trimmed = v.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        panel,
        mailer,
        jobs,
    })
}
