use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::email_logs::InsertEmailLogEntity;

#[async_trait]
#[automock]
pub trait EmailLogRepository {
    async fn record_email(&self, entry: InsertEmailLogEntity) -> Result<Uuid>;
}
