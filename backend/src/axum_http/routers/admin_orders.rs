use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use crates::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    email::mailer_client::MailerClient,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            email_logs::EmailLogPostgres, invoices::InvoicePostgres, orders::OrderPostgres,
            payments::PaymentPostgres,
        },
    },
    panel::panel_client::PanelClient,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    config::config_model::DotEnvyConfig,
    usecases::order_lifecycle::OrderLifecycleController,
};

type Controller = OrderLifecycleController<
    OrderPostgres,
    InvoicePostgres,
    PaymentPostgres,
    PanelClient,
    MailerClient,
>;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let order_repo = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));
    let invoice_repo = Arc::new(InvoicePostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let email_log_repo = Arc::new(EmailLogPostgres::new(Arc::clone(&db_pool)));

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

    let controller = Arc::new(OrderLifecycleController::new(
        order_repo,
        invoice_repo,
        payment_repo,
        panel,
        mailer,
    ));

    Router::new()
        .route("/orders/:order_id/provision", post(provision_order))
        .route("/orders/:order_id/suspend", post(suspend_order))
        .route("/orders/:order_id/unsuspend", post(unsuspend_order))
        .route("/orders/:order_id/cancel", post(cancel_order))
        .route("/orders/:order_id", delete(delete_order))
        .route("/orders/bulk-suspend", post(bulk_suspend))
        .route("/orders/bulk-unsuspend", post(bulk_unsuspend))
        .route("/orders/bulk-delete", post(bulk_delete))
        .route("/payments/:payment_id/override", post(override_payment))
        .with_state(controller)
}

#[derive(Debug, Deserialize)]
pub struct BulkOrdersRequest {
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct OverridePaymentRequest {
    pub status: String,
}

pub async fn provision_order(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match controller.provision(order_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "active" }))).into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn suspend_order(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match controller.suspend(order_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "status": "suspended",
                "panel_warning": outcome.panel_warning,
            })),
        )
            .into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn unsuspend_order(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match controller.unsuspend(order_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "status": "active",
                "panel_warning": outcome.panel_warning,
            })),
        )
            .into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn cancel_order(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match controller.cancel(order_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "cancelled" }))).into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn delete_order(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match controller.delete(order_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "status": "deleted",
                "panel_warning": outcome.panel_warning,
            })),
        )
            .into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn bulk_suspend(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Json(request): Json<BulkOrdersRequest>,
) -> impl IntoResponse {
    let outcome = controller.bulk_suspend(&request.order_ids).await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn bulk_unsuspend(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Json(request): Json<BulkOrdersRequest>,
) -> impl IntoResponse {
    let outcome = controller.bulk_unsuspend(&request.order_ids).await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn bulk_delete(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Json(request): Json<BulkOrdersRequest>,
) -> impl IntoResponse {
    let outcome = controller.bulk_delete(&request.order_ids).await;
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn override_payment(
    State(controller): State<Arc<Controller>>,
    _admin: AdminUser,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<OverridePaymentRequest>,
) -> impl IntoResponse {
    let status = match request.status.as_str() {
        "pending" | "completed" | "failed" => PaymentStatus::from_str(&request.status),
        other => {
            return (
                StatusCode::BAD_REQUEST,
                format!("invalid status value: {}", other),
            )
                .into_response();
        }
    };

    match controller.admin_override_payment(payment_id, status).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": status.to_string() }))).into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}
