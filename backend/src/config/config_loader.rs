use anyhow::{Ok, Result};

use super::config_model::{AuthSecret, DotEnvyConfig};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = super::config_model::BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = super::config_model::Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let panel = super::config_model::Panel {
        base_url: std::env::var("PANEL_BASE_URL").expect("PANEL_BASE_URL is invalid"),
        api_key: std::env::var("PANEL_API_KEY").expect("PANEL_API_KEY is invalid"),
    };

    let qr_gateways = super::config_model::QrGateways {
        standard_base_url: std::env::var("QR_STANDARD_BASE_URL")
            .expect("QR_STANDARD_BASE_URL is invalid"),
        standard_api_key: std::env::var("QR_STANDARD_API_KEY")
            .expect("QR_STANDARD_API_KEY is invalid"),
        live_base_url: std::env::var("QR_LIVE_BASE_URL").expect("QR_LIVE_BASE_URL is invalid"),
        live_api_key: std::env::var("QR_LIVE_API_KEY").expect("QR_LIVE_API_KEY is invalid"),
    };

    let mailer = super::config_model::Mailer {
        endpoint: std::env::var("MAILER_ENDPOINT").ok(),
        api_key: std::env::var("MAILER_API_KEY").ok(),
        sender: std::env::var("MAILER_SENDER")
            .unwrap_or_else(|_| "billing@blockhost.example".to_string()),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        panel,
        qr_gateways,
        mailer,
    })
}

pub fn get_auth_secret() -> Result<AuthSecret> {
    dotenvy::dotenv().ok();

    Ok(AuthSecret {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    })
}
