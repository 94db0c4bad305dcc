use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait InvoiceReminderRepository {
    /// True if a reminder for this (invoice, threshold) key was already sent.
    async fn reminder_exists(&self, invoice_id: Uuid, threshold_days: i32) -> Result<bool>;

    async fn record_reminder(&self, invoice_id: Uuid, threshold_days: i32) -> Result<()>;
}
