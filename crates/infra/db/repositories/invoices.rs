use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, delete, dsl::max, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::invoices},
};
use domain::{
    entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
    repositories::invoices::InvoiceRepository,
    value_objects::enums::invoice_statuses::InvoiceStatus,
};

// Invoice numbers start above this floor so early invoices do not look like
// test data on customer documents.
const INVOICE_NUMBER_FLOOR: i64 = 1000;

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn create_invoice(&self, invoice: InsertInvoiceEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice_id = insert_into(invoices::table)
            .values(&invoice)
            .returning(invoices::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(invoice_id)
    }

    async fn next_invoice_number(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let current = invoices::table
            .select(max(invoices::number))
            .first::<Option<i64>>(&mut conn)?
            .unwrap_or(INVOICE_NUMBER_FLOOR);

        Ok(current + 1)
    }

    async fn find_by_id(&self, invoice_id: Uuid) -> Result<Option<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice = invoices::table
            .filter(invoices::id.eq(invoice_id))
            .first::<InvoiceEntity>(&mut conn)
            .optional()?;

        Ok(invoice)
    }

    async fn mark_invoice_paid(&self, invoice_id: Uuid, payment_method: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(invoices::table.filter(invoices::id.eq(invoice_id)))
            .set((
                invoices::status.eq(InvoiceStatus::Paid.to_string()),
                invoices::paid_at.eq(Some(Utc::now())),
                invoices::payment_method.eq(Some(payment_method)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_status_by_id(&self, invoice_id: Uuid, status: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(invoices::table.filter(invoices::id.eq(invoice_id)))
            .set(invoices::status.eq(status))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn list_unpaid_due_within(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .filter(invoices::status.eq(InvoiceStatus::Unpaid.to_string()))
            .filter(invoices::due_at.ge(from))
            .filter(invoices::due_at.le(to))
            .order(invoices::due_at.asc())
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_unpaid_by_order(&self, order_id: Uuid) -> Result<Vec<InvoiceEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .filter(invoices::order_id.eq(order_id))
            .filter(invoices::status.eq(InvoiceStatus::Unpaid.to_string()))
            .load::<InvoiceEntity>(&mut conn)?;

        Ok(results)
    }

    async fn delete_by_order(&self, order_id: Uuid) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(invoices::table.filter(invoices::order_id.eq(order_id)))
            .execute(&mut conn)?;

        Ok(deleted)
    }
}
