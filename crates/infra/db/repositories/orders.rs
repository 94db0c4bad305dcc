use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::orders},
};
use domain::{
    entities::orders::{InsertOrderEntity, OrderEntity},
    repositories::orders::OrderRepository,
    value_objects::enums::order_statuses::OrderStatus,
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_order(&self, order: InsertOrderEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order_id = insert_into(orders::table)
            .values(&order)
            .returning(orders::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(order_id)
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update_status(&self, order_id: Uuid, status: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table.filter(orders::id.eq(order_id)))
            .set((orders::status.eq(status), orders::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn set_provisioned(
        &self,
        order_id: Uuid,
        server_id: &str,
        server_details: serde_json::Value,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table.filter(orders::id.eq(order_id)))
            .set((
                orders::server_id.eq(Some(server_id)),
                orders::server_details.eq(server_details),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_server_details(
        &self,
        order_id: Uuid,
        server_details: serde_json::Value,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(orders::table.filter(orders::id.eq(order_id)))
            .set((
                orders::server_details.eq(server_details),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn list_active_overdue(
        &self,
        overdue_cutoff: DateTime<Utc>,
    ) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .filter(orders::status.eq(OrderStatus::Active.to_string()))
            .filter(orders::next_due_at.lt(overdue_cutoff))
            .order(orders::next_due_at.asc())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(orders::table.filter(orders::id.eq(order_id))).execute(&mut conn)?;

        Ok(())
    }
}
