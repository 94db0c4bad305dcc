use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
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
    payments::{
        live_channel::{PushChannel, WsPushChannel},
        live_qr::LiveQrClient,
        qr_gateway::QrGateway,
        standard_qr::StandardQrClient,
    },
};
use tokio::sync::watch;
use tracing::info;

use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    usecases::{
        checkout::{CheckoutModel, CheckoutUseCase, LIVE_GATEWAY},
        order_lifecycle::OrderLifecycleController,
        payment_watch::{
            PaymentConfirmer, PaymentWatcher, WatchState, WatchTarget, WatcherRegistry,
        },
    },
};

type Controller = OrderLifecycleController<
    OrderPostgres,
    InvoicePostgres,
    PaymentPostgres,
    PanelClient,
    MailerClient,
>;

pub struct CheckoutState {
    checkout_usecase: CheckoutUseCase<OrderPostgres, InvoicePostgres, PaymentPostgres>,
    confirmer: Arc<Controller>,
    standard_gateway: Arc<dyn QrGateway + Send + Sync>,
    live_gateway: Arc<dyn QrGateway + Send + Sync>,
    push_channel: Arc<dyn PushChannel + Send + Sync>,
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

    let checkout_usecase = CheckoutUseCase::new(
        Arc::clone(&order_repo),
        Arc::clone(&invoice_repo),
        Arc::clone(&payment_repo),
        Arc::clone(&standard_gateway),
        Arc::clone(&live_gateway),
    );
    let confirmer = Arc::new(OrderLifecycleController::new(
        order_repo,
        invoice_repo,
        payment_repo,
        panel,
        mailer,
    ));

    Router::new()
        .route("/", post(create_checkout))
        .with_state(Arc::new(CheckoutState {
            checkout_usecase,
            confirmer,
            standard_gateway,
            live_gateway,
            push_channel: Arc::new(WsPushChannel),
            registry,
        }))
}

pub async fn create_checkout(
    State(state): State<Arc<CheckoutState>>,
    auth: AuthUser,
    Json(model): Json<CheckoutModel>,
) -> impl IntoResponse {
    let dto = match state
        .checkout_usecase
        .checkout(auth.user_id, auth.email.clone(), model)
        .await
    {
        Ok(dto) => dto,
        Err(err) => return (err.status_code(), err.to_string()).into_response(),
    };

    // Watch the charge until it is paid, expires or the customer closes the
    // payment UI.
    let gateway = if dto.gateway == LIVE_GATEWAY {
        Arc::clone(&state.live_gateway)
    } else {
        Arc::clone(&state.standard_gateway)
    };
    let (cancel, generation) = state.registry.register(dto.order_id);
    let (state_tx, _state_rx) = watch::channel(WatchState::Disconnected);
    let watcher = PaymentWatcher::new(
        gateway,
        Arc::clone(&state.push_channel),
        Arc::clone(&state.confirmer) as Arc<dyn PaymentConfirmer>,
        WatchTarget {
            order_id: dto.order_id,
            transaction_id: dto.transaction_id.clone(),
            ws_url: dto.ws_url.clone(),
            expires_in_secs: dto.expires_in_secs,
        },
        state_tx,
        cancel,
    );

    let registry = Arc::clone(&state.registry);
    let order_id = dto.order_id;
    tokio::spawn(async move {
        let outcome = watcher.run().await;
        info!(%order_id, outcome = ?outcome, "checkout: payment watcher finished");
        registry.remove(order_id, generation);
    });

    (StatusCode::CREATED, Json(dto)).into_response()
}
