use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{invoices, payments},
    },
};
use domain::{
    entities::payments::{NewPaymentEntity, PaymentEntity},
    repositories::payments::PaymentRepository,
    value_objects::enums::payment_statuses::PaymentStatus,
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn record_payment(&self, payment: NewPaymentEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment_id = insert_into(payments::table)
            .values(&payment)
            .returning(payments::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(payment_id)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .filter(payments::id.eq(payment_id))
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn find_pending_by_order(&self, order_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let payment = payments::table
            .inner_join(invoices::table)
            .filter(invoices::order_id.eq(order_id))
            .filter(payments::status.eq(PaymentStatus::Pending.to_string()))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(payment)
    }

    async fn update_status(&self, payment_id: Uuid, status: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payments::table.filter(payments::id.eq(payment_id)))
            .set((
                payments::status.eq(status),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
