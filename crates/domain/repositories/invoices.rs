use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::invoices::{InsertInvoiceEntity, InvoiceEntity};

#[async_trait]
#[automock]
pub trait InvoiceRepository {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<Uuid>;

    /// Next value of the human-readable sequential invoice number.
    async fn next_invoice_number(&self) -> Result<i64>;

    async fn find_by_id(&self, invoice_id: Uuid) -> Result<Option<InvoiceEntity>>;

    async fn mark_invoice_paid(&self, invoice_id: Uuid, payment_method: &str) -> Result<()>;

    async fn update_status_by_id(&self, invoice_id: Uuid, status: &str) -> Result<()>;

    /// Unpaid invoices with a due date inside [now, now + lookahead].
    /// Input for the reminder pass.
    async fn list_unpaid_due_within(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEntity>>;

    async fn list_unpaid_by_order(&self, order_id: Uuid) -> Result<Vec<InvoiceEntity>>;

    async fn delete_by_order(&self, order_id: Uuid) -> Result<usize>;
}
