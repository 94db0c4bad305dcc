use std::{collections::HashMap, sync::Arc};

use crates::{
    domain::{
        entities::orders::OrderEntity,
        repositories::{
            invoices::InvoiceRepository, orders::OrderRepository, payments::PaymentRepository,
        },
        value_objects::{
            enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
            orders::{ProvisioningLogEntry, ProvisioningLogStatus, ServerDetails},
        },
    },
    email::mailer_client::{EmailAction, EmailMessage, EmailNotifier},
    panel::panel_client::{CreateServerRequest, PanelGateway, sanitize_snapshot},
    payments::qr_gateway::format_display_amount,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order already has a provisioned server")]
    AlreadyProvisioned,
    #[error("provisioning failed: {0}")]
    ProvisioningFailed(String),
    #[error("order has an unrecognized status: {0}")]
    CorruptStatus(String),
    #[error("invalid status value: {0}")]
    InvalidStatus(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrderError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OrderError::NotFound | OrderError::PaymentNotFound => StatusCode::NOT_FOUND,
            OrderError::InvalidTransition { .. } | OrderError::AlreadyProvisioned => {
                StatusCode::CONFLICT
            }
            OrderError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            OrderError::ProvisioningFailed(_) => StatusCode::BAD_GATEWAY,
            OrderError::CorruptStatus(_) | OrderError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type LifecycleResult<T> = std::result::Result<T, OrderError>;

/// Result of an operation that talks to the panel on a best-effort basis.
/// The state change succeeded; `panel_warning` tells the operator whether the
/// panel call did too.
#[derive(Debug, Default)]
pub struct LifecycleOutcome {
    pub panel_warning: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BulkOutcome {
    pub success_count: usize,
    pub fail_count: usize,
}

/// Single writer of order status. Every operation re-reads the row, checks the
/// transition table, and only then fires side effects, so concurrent actors
/// (watch loop, admin console, scheduler) cannot double-apply an effect.
pub struct OrderLifecycleController<O, I, P, Pnl, M>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pnl: PanelGateway + Send + Sync + 'static,
    M: EmailNotifier + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    invoice_repo: Arc<I>,
    payment_repo: Arc<P>,
    panel: Arc<Pnl>,
    mailer: Arc<M>,
}

impl<O, I, P, Pnl, M> OrderLifecycleController<O, I, P, Pnl, M>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    Pnl: PanelGateway + Send + Sync + 'static,
    M: EmailNotifier + Send + Sync + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        invoice_repo: Arc<I>,
        payment_repo: Arc<P>,
        panel: Arc<Pnl>,
        mailer: Arc<M>,
    ) -> Self {
        Self {
            order_repo,
            invoice_repo,
            payment_repo,
            panel,
            mailer,
        }
    }

    /// pending → paid. Marks the invoice paid, completes the pending payment
    /// row, then advances the order. Rejecting non-pending orders here is the
    /// systemwide at-most-once guard behind the payment watch loop.
    pub async fn confirm_payment(&self, order_id: Uuid) -> LifecycleResult<()> {
        let order = self.load_order(order_id).await?;
        let from = Self::parse_status(&order)?;
        Self::ensure_transition(from, OrderStatus::Paid)?;

        let payment = self
            .payment_repo
            .find_pending_by_order(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to load pending payment");
                OrderError::Internal(err)
            })?;
        let payment_method = payment
            .as_ref()
            .map(|p| p.gateway.clone())
            .unwrap_or_else(|| "qr".to_string());

        let invoices = self
            .invoice_repo
            .list_unpaid_by_order(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to load unpaid invoices");
                OrderError::Internal(err)
            })?;
        for invoice in &invoices {
            self.invoice_repo
                .mark_invoice_paid(invoice.id, &payment_method)
                .await
                .map_err(|err| {
                    error!(
                        %order_id,
                        invoice_id = %invoice.id,
                        db_error = ?err,
                        "orders: failed to mark invoice paid"
                    );
                    OrderError::Internal(err)
                })?;
        }

        if let Some(payment) = payment {
            self.payment_repo
                .update_status(payment.id, &PaymentStatus::Completed.to_string())
                .await
                .map_err(|err| {
                    error!(
                        %order_id,
                        payment_id = %payment.id,
                        db_error = ?err,
                        "orders: failed to complete payment row"
                    );
                    OrderError::Internal(err)
                })?;
        }

        self.update_status(order_id, OrderStatus::Paid).await?;

        info!(%order_id, "orders: payment confirmed");
        self.notify(&order, EmailAction::PaymentConfirmation).await;

        Ok(())
    }

    /// paid|failed → provisioning → active|failed. Never calls the panel for
    /// an order that already holds a server reference.
    pub async fn provision(&self, order_id: Uuid) -> LifecycleResult<()> {
        let order = self.load_order(order_id).await?;

        if order.server_id.is_some() {
            warn!(
                %order_id,
                server_id = ?order.server_id,
                "orders: provision requested for an already provisioned order"
            );
            return Err(OrderError::AlreadyProvisioned);
        }

        let from = Self::parse_status(&order)?;
        Self::ensure_transition(from, OrderStatus::Provisioning)?;

        let mut details = ServerDetails::from_value(&order.server_details)
            .map_err(OrderError::Internal)?;

        let request = CreateServerRequest {
            order_id,
            server_details: details.plan.clone(),
        };
        let request_snapshot =
            sanitize_snapshot(&serde_json::to_value(&request).map_err(anyhow::Error::from)?);

        details.append_log(ProvisioningLogEntry::new(
            ProvisioningLogStatus::Started,
            "server create requested",
            Some(request_snapshot.clone()),
            None,
        ));
        self.order_repo
            .update_server_details(order_id, details.to_value().map_err(OrderError::Internal)?)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to write provisioning log");
                OrderError::Internal(err)
            })?;
        self.update_status(order_id, OrderStatus::Provisioning)
            .await?;

        info!(%order_id, "orders: calling panel create");
        match self.panel.create_server(request).await {
            Ok(resp) => {
                let response_snapshot = sanitize_snapshot(
                    &serde_json::to_value(&resp).map_err(anyhow::Error::from)?,
                );
                details.connection = resp.connection_info.clone();
                details.append_log(ProvisioningLogEntry::new(
                    ProvisioningLogStatus::Success,
                    "server allocated",
                    None,
                    Some(response_snapshot),
                ));

                self.order_repo
                    .set_provisioned(
                        order_id,
                        &resp.server_id,
                        details.to_value().map_err(OrderError::Internal)?,
                    )
                    .await
                    .map_err(|err| {
                        error!(
                            %order_id,
                            server_id = %resp.server_id,
                            db_error = ?err,
                            "orders: failed to store provisioning result"
                        );
                        OrderError::Internal(err)
                    })?;
                self.update_status(order_id, OrderStatus::Active).await?;

                info!(%order_id, server_id = %resp.server_id, "orders: provisioning succeeded");
                Ok(())
            }
            Err(err) => {
                warn!(%order_id, error = ?err, "orders: panel create failed");
                details.append_log(ProvisioningLogEntry::new(
                    ProvisioningLogStatus::Failed,
                    err.to_string(),
                    Some(request_snapshot),
                    None,
                ));
                self.order_repo
                    .update_server_details(
                        order_id,
                        details.to_value().map_err(OrderError::Internal)?,
                    )
                    .await
                    .map_err(|db_err| {
                        error!(%order_id, db_error = ?db_err, "orders: failed to write failure log");
                        OrderError::Internal(db_err)
                    })?;
                self.update_status(order_id, OrderStatus::Failed).await?;

                Err(OrderError::ProvisioningFailed(err.to_string()))
            }
        }
    }

    /// active → suspended. A panel failure does not block the status change;
    /// it is reported back as a warning for the operator.
    pub async fn suspend(&self, order_id: Uuid) -> LifecycleResult<LifecycleOutcome> {
        let order = self.load_order(order_id).await?;
        let from = Self::parse_status(&order)?;
        Self::ensure_transition(from, OrderStatus::Suspended)?;

        let panel_warning = match order.server_id.as_deref() {
            Some(server_id) => match self.panel.suspend_server(server_id).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(%order_id, server_id, error = ?err, "orders: panel suspend failed");
                    Some(err.to_string())
                }
            },
            None => None,
        };

        self.update_status(order_id, OrderStatus::Suspended).await?;

        info!(%order_id, "orders: suspended");
        self.notify(&order, EmailAction::Suspension).await;

        Ok(LifecycleOutcome { panel_warning })
    }

    /// suspended → active, symmetric with `suspend`. The server reference is
    /// untouched either way.
    pub async fn unsuspend(&self, order_id: Uuid) -> LifecycleResult<LifecycleOutcome> {
        let order = self.load_order(order_id).await?;
        let from = Self::parse_status(&order)?;
        Self::ensure_transition(from, OrderStatus::Active)?;

        let panel_warning = match order.server_id.as_deref() {
            Some(server_id) => match self.panel.unsuspend_server(server_id).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(%order_id, server_id, error = ?err, "orders: panel unsuspend failed");
                    Some(err.to_string())
                }
            },
            None => None,
        };

        self.update_status(order_id, OrderStatus::Active).await?;

        info!(%order_id, "orders: reactivated");
        self.notify(&order, EmailAction::Reactivation).await;

        Ok(LifecycleOutcome { panel_warning })
    }

    /// Status-only transition to cancelled. No panel call.
    pub async fn cancel(&self, order_id: Uuid) -> LifecycleResult<()> {
        let order = self.load_order(order_id).await?;
        let from = Self::parse_status(&order)?;
        Self::ensure_transition(from, OrderStatus::Cancelled)?;

        self.update_status(order_id, OrderStatus::Cancelled).await?;

        info!(%order_id, "orders: cancelled");
        Ok(())
    }

    /// Admin "delete service": notify the customer, terminate the backing
    /// instance, cascade invoice deletion, drop the order row last.
    pub async fn delete(&self, order_id: Uuid) -> LifecycleResult<LifecycleOutcome> {
        let order = self.load_order(order_id).await?;
        let from = Self::parse_status(&order)?;
        if from.is_terminal() {
            return Err(OrderError::InvalidTransition {
                from,
                to: OrderStatus::Terminated,
            });
        }

        self.notify(&order, EmailAction::Termination).await;

        let panel_warning = match order.server_id.as_deref() {
            Some(server_id) => match self.panel.terminate_server(server_id).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(%order_id, server_id, error = ?err, "orders: panel terminate failed");
                    Some(err.to_string())
                }
            },
            None => None,
        };

        let deleted_invoices = self
            .invoice_repo
            .delete_by_order(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to cascade invoice deletion");
                OrderError::Internal(err)
            })?;
        self.order_repo.delete_order(order_id).await.map_err(|err| {
            error!(%order_id, db_error = ?err, "orders: failed to delete order row");
            OrderError::Internal(err)
        })?;

        info!(%order_id, deleted_invoices, "orders: service deleted");
        Ok(LifecycleOutcome { panel_warning })
    }

    /// Back-office escape hatch: force a payment row's status. Overriding to
    /// completed also settles the invoice it references.
    pub async fn admin_override_payment(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> LifecycleResult<()> {
        let payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "orders: failed to load payment");
                OrderError::Internal(err)
            })?
            .ok_or(OrderError::PaymentNotFound)?;

        self.payment_repo
            .update_status(payment_id, &status.to_string())
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "orders: failed to override payment status");
                OrderError::Internal(err)
            })?;

        if status == PaymentStatus::Completed {
            if let Some(invoice_id) = payment.invoice_id {
                self.invoice_repo
                    .mark_invoice_paid(invoice_id, &payment.gateway)
                    .await
                    .map_err(|err| {
                        error!(
                            %payment_id,
                            %invoice_id,
                            db_error = ?err,
                            "orders: failed to cascade invoice paid"
                        );
                        OrderError::Internal(err)
                    })?;
            }
        }

        info!(%payment_id, status = %status, "orders: payment status overridden");
        Ok(())
    }

    pub async fn bulk_suspend(&self, order_ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &order_id in order_ids {
            match self.suspend(order_id).await {
                Ok(_) => outcome.success_count += 1,
                Err(err) => {
                    warn!(%order_id, error = %err, "orders: bulk suspend item failed");
                    outcome.fail_count += 1;
                }
            }
        }
        outcome
    }

    pub async fn bulk_unsuspend(&self, order_ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &order_id in order_ids {
            match self.unsuspend(order_id).await {
                Ok(_) => outcome.success_count += 1,
                Err(err) => {
                    warn!(%order_id, error = %err, "orders: bulk unsuspend item failed");
                    outcome.fail_count += 1;
                }
            }
        }
        outcome
    }

    pub async fn bulk_delete(&self, order_ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &order_id in order_ids {
            match self.delete(order_id).await {
                Ok(_) => outcome.success_count += 1,
                Err(err) => {
                    warn!(%order_id, error = %err, "orders: bulk delete item failed");
                    outcome.fail_count += 1;
                }
            }
        }
        outcome
    }

    async fn load_order(&self, order_id: Uuid) -> LifecycleResult<OrderEntity> {
        self.order_repo
            .find_by_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders: failed to load order");
                OrderError::Internal(err)
            })?
            .ok_or(OrderError::NotFound)
    }

    async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> LifecycleResult<()> {
        self.order_repo
            .update_status(order_id, &status.to_string())
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    status = %status,
                    db_error = ?err,
                    "orders: failed to update order status"
                );
                OrderError::Internal(err)
            })
    }

    fn parse_status(order: &OrderEntity) -> LifecycleResult<OrderStatus> {
        OrderStatus::from_str(&order.status)
            .ok_or_else(|| OrderError::CorruptStatus(order.status.clone()))
    }

    fn ensure_transition(from: OrderStatus, to: OrderStatus) -> LifecycleResult<()> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            warn!(%from, %to, "orders: transition rejected");
            Err(OrderError::InvalidTransition { from, to })
        }
    }

    async fn notify(&self, order: &OrderEntity, action: EmailAction) {
        let recipient = ServerDetails::from_value(&order.server_details)
            .ok()
            .and_then(|details| details.contact_email);

        let Some(recipient) = recipient else {
            debug!(order_id = %order.id, action = %action, "orders: no contact email on order");
            return;
        };

        let params = HashMap::from([
            ("order_id".to_string(), order.id.to_string()),
            (
                "amount".to_string(),
                format_display_amount(order.price_minor, &order.currency),
            ),
            ("currency".to_string(), order.currency.clone()),
        ]);

        self.mailer
            .send(EmailMessage {
                action,
                recipient,
                params,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::{
        domain::{
            entities::{invoices::InvoiceEntity, payments::PaymentEntity},
            repositories::{
                invoices::MockInvoiceRepository, orders::MockOrderRepository,
                payments::MockPaymentRepository,
            },
            value_objects::orders::{ConnectionInfo, ServerPlan},
        },
        email::mailer_client::MockEmailNotifier,
        panel::panel_client::{CreateServerResponse, MockPanelGateway},
    };
    use mockall::Sequence;
    use mockall::predicate::eq;

    type TestController = OrderLifecycleController<
        MockOrderRepository,
        MockInvoiceRepository,
        MockPaymentRepository,
        MockPanelGateway,
        MockEmailNotifier,
    >;

    fn controller(
        orders: MockOrderRepository,
        invoices: MockInvoiceRepository,
        payments: MockPaymentRepository,
        panel: MockPanelGateway,
        mailer: MockEmailNotifier,
    ) -> TestController {
        OrderLifecycleController::new(
            Arc::new(orders),
            Arc::new(invoices),
            Arc::new(payments),
            Arc::new(panel),
            Arc::new(mailer),
        )
    }

    fn make_order(status: &str, server_id: Option<&str>) -> OrderEntity {
        let details = ServerDetails {
            plan: ServerPlan {
                name: "iron-4gb".to_string(),
                location: "sg".to_string(),
                memory_mb: 4096,
                slots: 20,
            },
            contact_email: Some("player@example.com".to_string()),
            connection: None,
            provisioning_log: vec![],
        };

        OrderEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            price_minor: 1000,
            currency: "USD".to_string(),
            billing_cycle: "monthly".to_string(),
            next_due_at: Utc::now(),
            status: status.to_string(),
            server_details: details.to_value().unwrap(),
            server_id: server_id.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_invoice(order_id: Uuid) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            number: 1001,
            user_id: Uuid::new_v4(),
            order_id: Some(order_id),
            subtotal_minor: 1000,
            tax_minor: 0,
            discount_minor: 0,
            total_minor: 1000,
            currency: "USD".to_string(),
            due_at: Utc::now(),
            status: "unpaid".to_string(),
            payment_method: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    fn make_payment(invoice_id: Option<Uuid>) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            invoice_id,
            user_id: Uuid::new_v4(),
            gateway: "standard".to_string(),
            amount_minor: 1000,
            currency: "USD".to_string(),
            transaction_ref: Some("txn_1".to_string()),
            gateway_response: serde_json::json!({}),
            status: "pending".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn expect_email(mailer: &mut MockEmailNotifier, times: usize) {
        mailer
            .expect_send()
            .times(times)
            .returning(|_| Box::pin(async {}));
    }

    #[tokio::test]
    async fn confirm_payment_settles_invoice_and_payment() {
        let order = make_order("pending", None);
        let order_id = order.id;
        let invoice = make_invoice(order_id);
        let invoice_id = invoice.id;
        let payment = make_payment(Some(invoice_id));
        let payment_id = payment.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_id()
            .with(eq(order_id))
            .returning(move |_| {
                let order = order.clone();
                Box::pin(async move { Ok(Some(order)) })
            });
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "paid")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_list_unpaid_by_order()
            .with(eq(order_id))
            .returning(move |_| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(vec![invoice]) })
            });
        invoices
            .expect_mark_invoice_paid()
            .withf(move |id, method| *id == invoice_id && method == "standard")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_pending_by_order()
            .with(eq(order_id))
            .returning(move |_| {
                let payment = payment.clone();
                Box::pin(async move { Ok(Some(payment)) })
            });
        payments
            .expect_update_status()
            .withf(move |id, status| *id == payment_id && status == "completed")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut mailer = MockEmailNotifier::new();
        expect_email(&mut mailer, 1);

        let controller = controller(
            orders,
            invoices,
            payments,
            MockPanelGateway::new(),
            mailer,
        );

        controller.confirm_payment(order_id).await.unwrap();
    }

    #[tokio::test]
    async fn confirm_payment_rejects_non_pending_order() {
        let order = make_order("active", Some("srv-1"));
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        orders.expect_update_status().times(0);

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            MockPanelGateway::new(),
            MockEmailNotifier::new(),
        );

        let err = controller.confirm_payment(order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn provision_happy_path_stores_server_reference() {
        let order = make_order("paid", None);
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        orders
            .expect_update_server_details()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "provisioning")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        orders
            .expect_set_provisioned()
            .withf(move |id, server_id, details| {
                let parsed = ServerDetails::from_value(details).unwrap();
                *id == order_id
                    && server_id == "srv-1"
                    && parsed.connection.as_ref().map(|c| c.host.as_str())
                        == Some("node1.example.com")
                    && parsed.provisioning_log.len() == 2
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(()) }));
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "active")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut panel = MockPanelGateway::new();
        panel.expect_create_server().times(1).returning(|_| {
            Box::pin(async {
                Ok(CreateServerResponse {
                    status: "installing".to_string(),
                    server_id: "srv-1".to_string(),
                    connection_info: Some(ConnectionInfo {
                        host: "node1.example.com".to_string(),
                        port: 25565,
                        panel_url: None,
                    }),
                })
            })
        });

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            MockEmailNotifier::new(),
        );

        controller.provision(order_id).await.unwrap();
    }

    #[tokio::test]
    async fn provision_skips_panel_when_server_already_exists() {
        let order = make_order("paid", Some("srv-1"));
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });

        let mut panel = MockPanelGateway::new();
        panel.expect_create_server().times(0);

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            MockEmailNotifier::new(),
        );

        let err = controller.provision(order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::AlreadyProvisioned));
    }

    #[tokio::test]
    async fn provision_failure_marks_order_failed_with_log() {
        let order = make_order("paid", None);
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        // started entry, then failed entry
        orders
            .expect_update_server_details()
            .times(2)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "provisioning")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "failed")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        orders.expect_set_provisioned().times(0);

        let mut panel = MockPanelGateway::new();
        panel
            .expect_create_server()
            .times(1)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("panel unreachable")) }));

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            MockEmailNotifier::new(),
        );

        let err = controller.provision(order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::ProvisioningFailed(_)));
    }

    #[tokio::test]
    async fn suspend_proceeds_when_panel_fails() {
        let order = make_order("active", Some("srv-1"));
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "suspended")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut panel = MockPanelGateway::new();
        panel
            .expect_suspend_server()
            .with(eq("srv-1"))
            .times(1)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("panel timeout")) }));

        let mut mailer = MockEmailNotifier::new();
        expect_email(&mut mailer, 1);

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            mailer,
        );

        let outcome = controller.suspend(order_id).await.unwrap();
        assert!(outcome.panel_warning.is_some());
    }

    #[tokio::test]
    async fn unsuspend_reactivates_without_touching_server_reference() {
        let order = make_order("suspended", Some("srv-1"));
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });
        orders
            .expect_update_status()
            .withf(move |id, status| *id == order_id && status == "active")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        // No set_provisioned / update_server_details expectations: any call panics.

        let mut panel = MockPanelGateway::new();
        panel
            .expect_unsuspend_server()
            .with(eq("srv-1"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut mailer = MockEmailNotifier::new();
        expect_email(&mut mailer, 1);

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            mailer,
        );

        let outcome = controller.unsuspend(order_id).await.unwrap();
        assert!(outcome.panel_warning.is_none());
    }

    #[tokio::test]
    async fn delete_notifies_then_terminates_then_cascades() {
        let order = make_order("active", Some("srv-1"));
        let order_id = order.id;
        let mut seq = Sequence::new();

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });

        let mut mailer = MockEmailNotifier::new();
        mailer
            .expect_send()
            .withf(|message| message.action == EmailAction::Termination)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async {}));

        let mut panel = MockPanelGateway::new();
        panel
            .expect_terminate_server()
            .with(eq("srv-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_delete_by_order()
            .with(eq(order_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(1) }));

        orders
            .expect_delete_order()
            .with(eq(order_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(()) }));

        let controller = controller(
            orders,
            invoices,
            MockPaymentRepository::new(),
            panel,
            mailer,
        );

        controller.delete(order_id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_terminal_order() {
        let order = make_order("terminated", None);
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |_| {
            let order = order.clone();
            Box::pin(async move { Ok(Some(order)) })
        });

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            MockPanelGateway::new(),
            MockEmailNotifier::new(),
        );

        let err = controller.delete(order_id).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn override_to_completed_cascades_invoice_paid() {
        let invoice_id = Uuid::new_v4();
        let payment = make_payment(Some(invoice_id));
        let payment_id = payment.id;

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_by_id()
            .with(eq(payment_id))
            .returning(move |_| {
                let payment = payment.clone();
                Box::pin(async move { Ok(Some(payment)) })
            });
        payments
            .expect_update_status()
            .withf(move |id, status| *id == payment_id && status == "completed")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_mark_invoice_paid()
            .withf(move |id, method| *id == invoice_id && method == "standard")
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let controller = controller(
            MockOrderRepository::new(),
            invoices,
            payments,
            MockPanelGateway::new(),
            MockEmailNotifier::new(),
        );

        controller
            .admin_override_payment(payment_id, PaymentStatus::Completed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bulk_suspend_isolates_failures() {
        let good_one = make_order("active", Some("srv-1"));
        let good_two = make_order("active", Some("srv-2"));
        let ids = vec![good_one.id, Uuid::new_v4(), good_two.id];
        let missing_id = ids[1];

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_id()
            .times(3)
            .returning(move |id| {
                let hit = if id == good_one.id {
                    Some(good_one.clone())
                } else if id == good_two.id {
                    Some(good_two.clone())
                } else {
                    None
                };
                Box::pin(async move { Ok(hit) })
            });
        orders
            .expect_update_status()
            .times(2)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut panel = MockPanelGateway::new();
        panel
            .expect_suspend_server()
            .times(2)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut mailer = MockEmailNotifier::new();
        expect_email(&mut mailer, 2);

        let controller = controller(
            orders,
            MockInvoiceRepository::new(),
            MockPaymentRepository::new(),
            panel,
            mailer,
        );

        let outcome = controller.bulk_suspend(&ids).await;
        assert_eq!(
            outcome,
            BulkOutcome {
                success_count: 2,
                fail_count: 1
            }
        );
        // The missing id was still attempted, not short-circuited.
        assert!(ids.contains(&missing_id));
    }
}
