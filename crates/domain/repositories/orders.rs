use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::orders::{InsertOrderEntity, OrderEntity};

#[async_trait]
#[automock]
pub trait OrderRepository {
    async fn create_order(&self, order: InsertOrderEntity) -> Result<Uuid>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>>;

    async fn update_status(&self, order_id: Uuid, status: &str) -> Result<()>;

    /// Writes the provisioning result in one go: the panel instance reference
    /// plus the updated server_details document (connection info, log).
    async fn set_provisioned(
        &self,
        order_id: Uuid,
        server_id: &str,
        server_details: serde_json::Value,
    ) -> Result<()>;

    async fn update_server_details(
        &self,
        order_id: Uuid,
        server_details: serde_json::Value,
    ) -> Result<()>;

    /// Active orders whose due date passed before `overdue_cutoff`
    /// (now minus the grace period). Input for the suspension pass.
    async fn list_active_overdue(&self, overdue_cutoff: DateTime<Utc>)
    -> Result<Vec<OrderEntity>>;

    async fn delete_order(&self, order_id: Uuid) -> Result<()>;
}
