#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub panel: Panel,
    pub qr_gateways: QrGateways,
    pub mailer: Mailer,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthSecret {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub base_url: String,
    pub api_key: String,
}

/// Both QR backends are configured; the customer picks one per checkout.
#[derive(Debug, Clone)]
pub struct QrGateways {
    pub standard_base_url: String,
    pub standard_api_key: String,
    pub live_base_url: String,
    pub live_api_key: String,
}

#[derive(Debug, Clone)]
pub struct Mailer {
    /// None switches the mailer into simulated mode.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: String,
}
