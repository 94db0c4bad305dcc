use anyhow::Result;
use backend::axum_http::http_serve;
use backend::config::config_loader;
use crates::infra::db::postgres::postgres_connection;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let config = Arc::new(config_loader::load()?);
    info!(
        port = config.backend_server.port,
        "backend configuration loaded"
    );

    let db_pool = Arc::new(postgres_connection::establish_connection(
        &config.database.url,
    )?);
    info!("database pool ready");

    http_serve::start(config, db_pool).await
}
