use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        entities::{
            invoices::InsertInvoiceEntity, orders::InsertOrderEntity, payments::NewPaymentEntity,
        },
        repositories::{
            invoices::InvoiceRepository, orders::OrderRepository, payments::PaymentRepository,
        },
        value_objects::{
            enums::{
                billing_cycles::BillingCycle, invoice_statuses::InvoiceStatus,
                order_statuses::OrderStatus, payment_statuses::PaymentStatus,
            },
            orders::{ServerDetails, ServerPlan},
        },
    },
    payments::qr_gateway::{GenerateChargeRequest, QrGateway, format_display_amount},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

pub const STANDARD_GATEWAY: &str = "standard";
pub const LIVE_GATEWAY: &str = "live";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("unknown payment gateway: {0}")]
    UnknownGateway(String),
    #[error("order amount must be positive")]
    InvalidAmount,
    #[error("payment gateway rejected the charge: {0}")]
    GatewayFailed(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::UnknownGateway(_) | CheckoutError::InvalidAmount => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::GatewayFailed(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutModel {
    pub plan: ServerPlan,
    pub billing_cycle: String,
    pub price_minor: i32,
    pub currency: String,
    #[serde(default = "default_gateway")]
    pub gateway: String,
}

fn default_gateway() -> String {
    STANDARD_GATEWAY.to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutDto {
    pub order_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_id: Uuid,
    pub gateway: String,
    pub qr_code: String,
    pub transaction_id: String,
    pub ws_url: Option<String>,
    pub expires_in_secs: u64,
    pub display_amount: String,
}

/// Creates the pending order, its first invoice and a pending payment row,
/// then asks the selected QR backend for a scannable charge.
pub struct CheckoutUseCase<O, I, P>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    invoice_repo: Arc<I>,
    payment_repo: Arc<P>,
    standard_gateway: Arc<dyn QrGateway + Send + Sync>,
    live_gateway: Arc<dyn QrGateway + Send + Sync>,
}

impl<O, I, P> CheckoutUseCase<O, I, P>
where
    O: OrderRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        invoice_repo: Arc<I>,
        payment_repo: Arc<P>,
        standard_gateway: Arc<dyn QrGateway + Send + Sync>,
        live_gateway: Arc<dyn QrGateway + Send + Sync>,
    ) -> Self {
        Self {
            order_repo,
            invoice_repo,
            payment_repo,
            standard_gateway,
            live_gateway,
        }
    }

    pub async fn checkout(
        &self,
        user_id: Uuid,
        contact_email: Option<String>,
        model: CheckoutModel,
    ) -> Result<CheckoutDto, CheckoutError> {
        let gateway = self.select_gateway(&model.gateway)?;

        if model.price_minor <= 0 {
            return Err(CheckoutError::InvalidAmount);
        }

        let cycle = BillingCycle::from_str(&model.billing_cycle);
        let now = Utc::now();

        let details = ServerDetails {
            plan: model.plan.clone(),
            contact_email,
            connection: None,
            provisioning_log: vec![],
        };

        let order_id = self
            .order_repo
            .create_order(InsertOrderEntity {
                user_id,
                price_minor: model.price_minor,
                currency: model.currency.clone(),
                billing_cycle: cycle.to_string(),
                next_due_at: now + cycle.period(),
                status: OrderStatus::Pending.to_string(),
                server_details: details.to_value().map_err(CheckoutError::Internal)?,
                server_id: None,
            })
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to create order");
                CheckoutError::Internal(err)
            })?;

        let number = self.invoice_repo.next_invoice_number().await.map_err(|err| {
            error!(%order_id, db_error = ?err, "checkout: failed to allocate invoice number");
            CheckoutError::Internal(err)
        })?;
        let invoice_id = self
            .invoice_repo
            .create_invoice(InsertInvoiceEntity {
                number,
                user_id,
                order_id: Some(order_id),
                subtotal_minor: model.price_minor,
                tax_minor: 0,
                discount_minor: 0,
                total_minor: model.price_minor,
                currency: model.currency.clone(),
                due_at: now,
                status: InvoiceStatus::Unpaid.to_string(),
                payment_method: None,
                paid_at: None,
            })
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "checkout: failed to create invoice");
                CheckoutError::Internal(err)
            })?;

        info!(
            %user_id,
            %order_id,
            %invoice_id,
            gateway = %model.gateway,
            "checkout: generating charge"
        );
        let charge = gateway
            .generate_charge(GenerateChargeRequest {
                amount_minor: model.price_minor,
                currency: model.currency.clone(),
                order_id,
                invoice_id,
                description: format!("{} ({})", model.plan.name, cycle),
            })
            .await
            .map_err(|err| {
                error!(
                    %order_id,
                    gateway = %model.gateway,
                    error = ?err,
                    "checkout: charge generation failed"
                );
                CheckoutError::GatewayFailed(err.to_string())
            })?;

        let payment_id = self
            .payment_repo
            .record_payment(NewPaymentEntity {
                invoice_id: Some(invoice_id),
                user_id,
                gateway: model.gateway.clone(),
                amount_minor: model.price_minor,
                currency: model.currency.clone(),
                transaction_ref: Some(charge.transaction_id.clone()),
                gateway_response: serde_json::to_value(&charge).map_err(anyhow::Error::from)?,
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "checkout: failed to record pending payment");
                CheckoutError::Internal(err)
            })?;

        info!(
            %order_id,
            transaction_id = %charge.transaction_id,
            "checkout: charge created"
        );

        Ok(CheckoutDto {
            order_id,
            invoice_id,
            payment_id,
            gateway: model.gateway,
            qr_code: charge.qr_code,
            transaction_id: charge.transaction_id,
            ws_url: charge.ws_url,
            expires_in_secs: charge.expires_in_secs,
            display_amount: format_display_amount(model.price_minor, &model.currency),
        })
    }

    fn select_gateway(
        &self,
        name: &str,
    ) -> Result<Arc<dyn QrGateway + Send + Sync>, CheckoutError> {
        match name {
            STANDARD_GATEWAY => Ok(Arc::clone(&self.standard_gateway)),
            LIVE_GATEWAY => Ok(Arc::clone(&self.live_gateway)),
            other => Err(CheckoutError::UnknownGateway(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::repositories::{
            invoices::MockInvoiceRepository, orders::MockOrderRepository,
            payments::MockPaymentRepository,
        },
        payments::qr_gateway::{Charge, MockQrGateway},
    };

    fn model(gateway: &str) -> CheckoutModel {
        CheckoutModel {
            plan: ServerPlan {
                name: "iron-4gb".to_string(),
                location: "sg".to_string(),
                memory_mb: 4096,
                slots: 20,
            },
            billing_cycle: "monthly".to_string(),
            price_minor: 1000,
            currency: "USD".to_string(),
            gateway: gateway.to_string(),
        }
    }

    fn charge() -> Charge {
        Charge {
            qr_code: "00020101021229370016...".to_string(),
            transaction_id: "txn_1".to_string(),
            ws_url: None,
            expires_in_secs: 900,
        }
    }

    #[tokio::test]
    async fn checkout_creates_order_invoice_and_pending_payment() {
        let user_id = Uuid::new_v4();

        let mut orders = MockOrderRepository::new();
        orders
            .expect_create_order()
            .withf(move |order| {
                order.user_id == user_id
                    && order.status == "pending"
                    && order.server_id.is_none()
                    && order.price_minor == 1000
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_next_invoice_number()
            .returning(|| Box::pin(async { Ok(1001) }));
        invoices
            .expect_create_invoice()
            .withf(|invoice| {
                invoice.number == 1001
                    && invoice.status == "unpaid"
                    && invoice.paid_at.is_none()
                    && invoice.total_minor
                        == invoice.subtotal_minor + invoice.tax_minor - invoice.discount_minor
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_record_payment()
            .withf(|payment| {
                payment.status == "pending"
                    && payment.transaction_ref.as_deref() == Some("txn_1")
                    && payment.gateway == "standard"
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mut standard = MockQrGateway::new();
        standard
            .expect_generate_charge()
            .withf(|request| request.amount_minor == 1000 && request.currency == "USD")
            .times(1)
            .returning(|_| Box::pin(async { Ok(charge()) }));

        let usecase = CheckoutUseCase::new(
            Arc::new(orders),
            Arc::new(invoices),
            Arc::new(payments),
            Arc::new(standard),
            Arc::new(MockQrGateway::new()),
        );

        let dto = usecase
            .checkout(
                user_id,
                Some("player@example.com".to_string()),
                model("standard"),
            )
            .await
            .unwrap();

        assert_eq!(dto.transaction_id, "txn_1");
        assert_eq!(dto.display_amount, "10.00");
        assert_eq!(dto.gateway, "standard");
        assert!(dto.ws_url.is_none());
    }

    #[tokio::test]
    async fn checkout_rejects_unknown_gateway_before_any_write() {
        let usecase = CheckoutUseCase::new(
            Arc::new(MockOrderRepository::new()),
            Arc::new(MockInvoiceRepository::new()),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(MockQrGateway::new()),
            Arc::new(MockQrGateway::new()),
        );

        let err = usecase
            .checkout(Uuid::new_v4(), None, model("bitcoin"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::UnknownGateway(_)));
    }

    #[tokio::test]
    async fn checkout_surfaces_gateway_failure() {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_create_order()
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mut invoices = MockInvoiceRepository::new();
        invoices
            .expect_next_invoice_number()
            .returning(|| Box::pin(async { Ok(1002) }));
        invoices
            .expect_create_invoice()
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let mut live = MockQrGateway::new();
        live.expect_generate_charge()
            .times(1)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("gateway 503")) }));

        // Payment repo has no expectations: recording a payment would panic.
        let usecase = CheckoutUseCase::new(
            Arc::new(orders),
            Arc::new(invoices),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(MockQrGateway::new()),
            Arc::new(live),
        );

        let err = usecase
            .checkout(Uuid::new_v4(), None, model("live"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::GatewayFailed(_)));
    }
}
