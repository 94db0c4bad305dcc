use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use crates::{
    domain::repositories::{
        invoices::InvoiceRepository, orders::OrderRepository, payments::PaymentRepository,
    },
    email::mailer_client::EmailNotifier,
    panel::panel_client::PanelGateway,
    payments::{
        live_channel::{PushChannel, PushEvent},
        qr_gateway::{ChargeStatus, QrGateway},
    },
};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, MissedTickBehavior, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::order_lifecycle::{OrderError, OrderLifecycleController};

/// Fallback poll cadence while a charge is pending.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Fixed backoff before re-opening a dropped push channel.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Connection state surfaced to the payment UI over a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    Disconnected,
    Connecting,
    Live,
    Reconnecting,
    /// No push channel for this charge; polling is the only signal path.
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Confirmed,
    Expired,
    Cancelled,
}

/// The watcher's only side-effect seam. The lifecycle controller implements
/// this; a confirm that raced another actor is absorbed as success.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PaymentConfirmer: Send + Sync {
    async fn confirm(&self, order_id: Uuid) -> anyhow::Result<()>;
}

#[async_trait]
impl<O, I, P, Pnl, M> PaymentConfirmer for OrderLifecycleController<O, I, P, Pnl, M>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pnl: PanelGateway + Send + Sync + 'static,
    M: EmailNotifier + Send + Sync + 'static,
{
    async fn confirm(&self, order_id: Uuid) -> anyhow::Result<()> {
        match self.confirm_payment(order_id).await {
            Ok(()) => Ok(()),
            // Another path already advanced the order; the signal is stale,
            // not wrong.
            Err(OrderError::InvalidTransition { from, .. }) => {
                warn!(%order_id, %from, "payment watch: confirm raced, order already advanced");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// One watcher per order, so closing the payment UI can tear down exactly its
/// own loop.
#[derive(Default)]
pub struct WatcherRegistry {
    next_generation: AtomicU64,
    watchers: Mutex<HashMap<Uuid, (u64, CancellationToken)>>,
}

impl WatcherRegistry {
    /// Registers a fresh token for the order, cancelling any previous watcher.
    /// The returned generation identifies this registration to `remove`.
    pub fn register(&self, order_id: Uuid) -> (CancellationToken, u64) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        if let Some((_, old)) = watchers.insert(order_id, (generation, token.clone())) {
            old.cancel();
        }
        (token, generation)
    }

    /// Cancels the order's watcher. False when none was running.
    pub fn cancel(&self, order_id: Uuid) -> bool {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        match watchers.remove(&order_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drops the entry only while it still belongs to this registration, so a
    /// finished watcher cannot evict its replacement.
    pub fn remove(&self, order_id: Uuid, generation: u64) {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        if watchers
            .get(&order_id)
            .is_some_and(|(stored, _)| *stored == generation)
        {
            watchers.remove(&order_id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub order_id: Uuid,
    pub transaction_id: String,
    pub ws_url: Option<String>,
    pub expires_in_secs: u64,
}

/// Watches one pending charge until it is paid, expires or is cancelled.
///
/// Two signal paths run in parallel: the gateway poll every `POLL_INTERVAL`
/// and, when the charge carries a `ws_url`, a push channel that reconnects
/// after `RECONNECT_DELAY` whenever it drops. Both paths funnel into a single
/// guarded confirm, so the controller is invoked at most once per watcher.
pub struct PaymentWatcher {
    gateway: Arc<dyn QrGateway + Send + Sync>,
    channel: Arc<dyn PushChannel + Send + Sync>,
    confirmer: Arc<dyn PaymentConfirmer>,
    target: WatchTarget,
    state_tx: watch::Sender<WatchState>,
    cancel: CancellationToken,
}

impl PaymentWatcher {
    pub fn new(
        gateway: Arc<dyn QrGateway + Send + Sync>,
        channel: Arc<dyn PushChannel + Send + Sync>,
        confirmer: Arc<dyn PaymentConfirmer>,
        target: WatchTarget,
        state_tx: watch::Sender<WatchState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            channel,
            confirmer,
            target,
            state_tx,
            cancel,
        }
    }

    pub async fn run(self) -> WatchOutcome {
        let order_id = self.target.order_id;
        let deadline = Instant::now() + Duration::from_secs(self.target.expires_in_secs);

        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut events: Option<mpsc::Receiver<PushEvent>> = None;
        let mut next_connect = self.target.ws_url.as_ref().map(|_| Instant::now());
        let mut confirmed = false;

        if self.target.ws_url.is_none() {
            self.state_tx.send_replace(WatchState::Polling);
        }

        info!(
            %order_id,
            transaction_id = %self.target.transaction_id,
            live_channel = self.target.ws_url.is_some(),
            "payment watch: started"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(%order_id, "payment watch: cancelled");
                    self.state_tx.send_replace(WatchState::Disconnected);
                    return WatchOutcome::Cancelled;
                }

                _ = sleep_until(deadline) => {
                    info!(%order_id, "payment watch: charge expired");
                    self.state_tx.send_replace(WatchState::Disconnected);
                    return WatchOutcome::Expired;
                }

                _ = poll.tick() => {
                    match self.gateway.check_status(&self.target.transaction_id).await {
                        Ok(ChargeStatus::Paid) => {
                            if self.try_confirm(&mut confirmed).await {
                                return WatchOutcome::Confirmed;
                            }
                        }
                        Ok(ChargeStatus::Pending) => {}
                        Err(err) => {
                            warn!(%order_id, error = ?err, "payment watch: status poll failed");
                        }
                    }
                }

                event = Self::next_event(&mut events) => {
                    match event {
                        Some(event) if event.is_paid_for(&self.target.transaction_id) => {
                            if self.try_confirm(&mut confirmed).await {
                                return WatchOutcome::Confirmed;
                            }
                        }
                        Some(_) => {}
                        None => {
                            // Channel dropped while the charge is still open.
                            warn!(%order_id, "payment watch: push channel closed, will reconnect");
                            events = None;
                            next_connect = Some(Instant::now() + RECONNECT_DELAY);
                            self.state_tx.send_replace(WatchState::Reconnecting);
                        }
                    }
                }

                _ = Self::wait_for(next_connect), if events.is_none() => {
                    next_connect = None;
                    if let Some(url) = self.target.ws_url.as_deref() {
                        self.state_tx.send_replace(WatchState::Connecting);
                        match self.channel.connect(url).await {
                            Ok(rx) => {
                                info!(%order_id, "payment watch: push channel live");
                                events = Some(rx);
                                self.state_tx.send_replace(WatchState::Live);
                            }
                            Err(err) => {
                                warn!(%order_id, error = ?err, "payment watch: push connect failed");
                                next_connect = Some(Instant::now() + RECONNECT_DELAY);
                                self.state_tx.send_replace(WatchState::Reconnecting);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Single funnel for both signal paths. Returns true once the order has
    /// been confirmed, whether by this call or a previous one.
    async fn try_confirm(&self, confirmed: &mut bool) -> bool {
        if *confirmed {
            return true;
        }

        match self.confirmer.confirm(self.target.order_id).await {
            Ok(()) => {
                info!(order_id = %self.target.order_id, "payment watch: payment confirmed");
                *confirmed = true;
                true
            }
            Err(err) => {
                // Leave the watcher running; the next signal retries.
                error!(
                    order_id = %self.target.order_id,
                    error = ?err,
                    "payment watch: confirm failed"
                );
                false
            }
        }
    }

    async fn next_event(events: &mut Option<mpsc::Receiver<PushEvent>>) -> Option<PushEvent> {
        match events {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn wait_for(at: Option<Instant>) {
        match at {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Paid,
    Pending,
    NoPendingCharge,
}

#[derive(Debug, Error)]
pub enum PaymentCheckError {
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentCheckError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentCheckError::NotFound => StatusCode::NOT_FOUND,
            PaymentCheckError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Manual "I've completed payment" path: one status poll against the gateway
/// that issued the charge, confirming on the spot if it reports paid.
pub struct PaymentCheckUseCase<O, P, C>
where
    O: OrderRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    C: PaymentConfirmer + 'static,
{
    order_repo: Arc<O>,
    payment_repo: Arc<P>,
    standard_gateway: Arc<dyn QrGateway + Send + Sync>,
    live_gateway: Arc<dyn QrGateway + Send + Sync>,
    confirmer: Arc<C>,
}

impl<O, P, C> PaymentCheckUseCase<O, P, C>
where
    O: OrderRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    C: PaymentConfirmer + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        payment_repo: Arc<P>,
        standard_gateway: Arc<dyn QrGateway + Send + Sync>,
        live_gateway: Arc<dyn QrGateway + Send + Sync>,
        confirmer: Arc<C>,
    ) -> Self {
        Self {
            order_repo,
            payment_repo,
            standard_gateway,
            live_gateway,
            confirmer,
        }
    }

    /// Same ownership rule as the dashboard reads: a customer can only act on
    /// their own orders, and someone else's order id reads as 404.
    pub async fn authorize_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        is_admin: bool,
    ) -> Result<(), PaymentCheckError> {
        let order = self
            .order_repo
            .find_by_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payment check: failed to load order");
                PaymentCheckError::Internal(err)
            })?
            .ok_or(PaymentCheckError::NotFound)?;

        if !is_admin && order.user_id != user_id {
            return Err(PaymentCheckError::NotFound);
        }
        Ok(())
    }

    pub async fn check_now(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        is_admin: bool,
    ) -> Result<CheckOutcome, PaymentCheckError> {
        self.authorize_order(user_id, order_id, is_admin).await?;

        let Some(payment) = self.payment_repo.find_pending_by_order(order_id).await? else {
            return Ok(CheckOutcome::NoPendingCharge);
        };
        let Some(transaction_id) = payment.transaction_ref.as_deref() else {
            warn!(%order_id, payment_id = %payment.id, "payment check: pending payment has no transaction ref");
            return Ok(CheckOutcome::NoPendingCharge);
        };

        let gateway = match payment.gateway.as_str() {
            "live" => &self.live_gateway,
            _ => &self.standard_gateway,
        };

        match gateway.check_status(transaction_id).await? {
            ChargeStatus::Paid => {
                self.confirmer.confirm(order_id).await?;
                Ok(CheckOutcome::Paid)
            }
            ChargeStatus::Pending => Ok(CheckOutcome::Pending),
        }
    }
}
