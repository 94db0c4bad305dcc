use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{NewPaymentEntity, PaymentEntity};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn record_payment(&self, payment: NewPaymentEntity) -> Result<Uuid>;

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn find_pending_by_order(&self, order_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn update_status(&self, payment_id: Uuid, status: &str) -> Result<()>;
}
