use anyhow::Result;
use crates::domain::repositories::{
    invoice_reminders::InvoiceReminderRepository, invoices::InvoiceRepository,
    orders::OrderRepository,
};
use crates::email::mailer_client::{EmailNotifier, MailerClient};
use crates::infra::db::{
    postgres::postgres_connection,
    repositories::{
        email_logs::EmailLogPostgres, invoice_reminders::InvoiceReminderPostgres,
        invoices::InvoicePostgres, orders::OrderPostgres, payments::PaymentPostgres,
    },
};
use crates::panel::panel_client::PanelClient;
use backend::usecases::order_lifecycle::OrderLifecycleController;
use std::sync::Arc;
use tracing::error;
use tracing::info;
use worker::{
    axum_http, config, services,
    usecases::daily_job::{DailyJobUseCase, OrderSuspender},
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let order_repository = Arc::new(OrderPostgres::new(Arc::clone(&db_pool_arc)));
    let invoice_repository = Arc::new(InvoicePostgres::new(Arc::clone(&db_pool_arc)));
    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc)));
    let email_log_repository = Arc::new(EmailLogPostgres::new(Arc::clone(&db_pool_arc)));
    let reminder_repository: Arc<dyn InvoiceReminderRepository + Send + Sync> =
        Arc::new(InvoiceReminderPostgres::new(Arc::clone(&db_pool_arc)));

    let panel = Arc::new(PanelClient::new(
        dotenvy_env.panel.base_url.clone(),
        dotenvy_env.panel.api_key.clone(),
    ));
    let mailer = Arc::new(MailerClient::new(
        dotenvy_env.mailer.endpoint.clone(),
        dotenvy_env.mailer.api_key.clone(),
        dotenvy_env.mailer.sender.clone(),
        email_log_repository,
    ));

    // The suspension pass re-enters the same lifecycle controller the backend
    // admin console uses, so both paths share one transition rule set.
    let controller = Arc::new(OrderLifecycleController::new(
        Arc::clone(&order_repository),
        Arc::clone(&invoice_repository),
        Arc::clone(&payment_repository),
        panel,
        Arc::clone(&mailer),
    ));
    let suspender: Arc<dyn OrderSuspender + Send + Sync> = controller;

    let daily_job_usecase = Arc::new(DailyJobUseCase::new(
        order_repository as Arc<dyn OrderRepository + Send + Sync>,
        invoice_repository as Arc<dyn InvoiceRepository + Send + Sync>,
        reminder_repository,
        mailer as Arc<dyn EmailNotifier + Send + Sync>,
        suspender,
        dotenvy_env.jobs.clone(),
    ));

    let job_timer_loop = tokio::spawn(services::job_loop::run(
        Arc::clone(&daily_job_usecase),
        dotenvy_env.jobs.run_interval_secs,
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let server_usecase = Arc::clone(&daily_job_usecase);
    let internal_http_server =
        tokio::spawn(
            async move { axum_http::http_serve::start(server_config, server_usecase).await },
        );

    tokio::select! {
        result = job_timer_loop => result??,
        result = internal_http_server => result??,
    };
    Ok(())
}
