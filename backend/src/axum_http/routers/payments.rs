use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use crates::{
    email::mailer_client::MailerClient,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            email_logs::EmailLogPostgres, invoices::InvoicePostgres, orders::OrderPostgres,
            payments::PaymentPostgres,
        },
    },
    panel::panel_client::PanelClient,
    payments::{live_qr::LiveQrClient, qr_gateway::QrGateway, standard_qr::StandardQrClient},
};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    usecases::{
        order_lifecycle::OrderLifecycleController,
        payment_watch::{PaymentCheckError, PaymentCheckUseCase, WatcherRegistry},
    },
};

type Controller = OrderLifecycleController<
    OrderPostgres,
    InvoicePostgres,
    PaymentPostgres,
    PanelClient,
    MailerClient,
>;

pub struct PaymentsState {
    check_usecase: PaymentCheckUseCase<OrderPostgres, PaymentPostgres, Controller>,
    registry: Arc<WatcherRegistry>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    config: Arc<DotEnvyConfig>,
    registry: Arc<WatcherRegistry>,
) -> Router {
    let order_repo = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));
    let invoice_repo = Arc::new(InvoicePostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let email_log_repo = Arc::new(EmailLogPostgres::new(Arc::clone(&db_pool)));

    let standard_gateway: Arc<dyn QrGateway + Send + Sync> = Arc::new(StandardQrClient::new(
        config.qr_gateways.standard_base_url.clone(),
        config.qr_gateways.standard_api_key.clone(),
    ));
    let live_gateway: Arc<dyn QrGateway + Send + Sync> = Arc::new(LiveQrClient::new(
        config.qr_gateways.live_base_url.clone(),
        config.qr_gateways.live_api_key.clone(),
    ));

    let panel = Arc::new(PanelClient::new(
        config.panel.base_url.clone(),
        config.panel.api_key.clone(),
    ));
    let mailer = Arc::new(MailerClient::new(
        config.mailer.endpoint.clone(),
        config.mailer.api_key.clone(),
        config.mailer.sender.clone(),
        email_log_repo,
    ));

    let confirmer = Arc::new(OrderLifecycleController::new(
        Arc::clone(&order_repo),
        invoice_repo,
        Arc::clone(&payment_repo),
        panel,
        mailer,
    ));
    let check_usecase = PaymentCheckUseCase::new(
        order_repo,
        payment_repo,
        standard_gateway,
        live_gateway,
        confirmer,
    );

    Router::new()
        .route("/:order_id/check", post(check_payment))
        .route("/:order_id/watch", delete(cancel_watch))
        .with_state(Arc::new(PaymentsState {
            check_usecase,
            registry,
        }))
}

pub async fn check_payment(
    State(state): State<Arc<PaymentsState>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .check_usecase
        .check_now(auth.user_id, order_id, auth.is_admin())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(json!({ "status": outcome }))).into_response(),
        Err(err) => {
            if matches!(err, PaymentCheckError::Internal(_)) {
                error!(%order_id, error = ?err, "payments: manual check failed");
            }
            (err.status_code(), err.to_string()).into_response()
        }
    }
}

pub async fn cancel_watch(
    State(state): State<Arc<PaymentsState>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(err) = state
        .check_usecase
        .authorize_order(auth.user_id, order_id, auth.is_admin())
        .await
    {
        return (err.status_code(), err.to_string()).into_response();
    }

    let cancelled = state.registry.cancel(order_id);
    info!(%order_id, cancelled, "payments: watch cancellation requested");
    (StatusCode::OK, Json(json!({ "cancelled": cancelled }))).into_response()
}
