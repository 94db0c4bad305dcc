use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::invoice_reminders},
};
use domain::{
    entities::invoice_reminders::InsertInvoiceReminderEntity,
    repositories::invoice_reminders::InvoiceReminderRepository,
};

pub struct InvoiceReminderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoiceReminderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceReminderRepository for InvoiceReminderPostgres {
    async fn reminder_exists(&self, invoice_id: Uuid, threshold_days: i32) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let matches = invoice_reminders::table
            .filter(invoice_reminders::invoice_id.eq(invoice_id))
            .filter(invoice_reminders::threshold_days.eq(threshold_days))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        Ok(matches > 0)
    }

    async fn record_reminder(&self, invoice_id: Uuid, threshold_days: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        insert_into(invoice_reminders::table)
            .values(&InsertInvoiceReminderEntity {
                invoice_id,
                threshold_days,
            })
            .execute(&mut conn)?;

        Ok(())
    }
}
