use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::invoice_reminders;

/// Dedup record for the renewal reminder pass: one row per
/// (invoice, threshold) means that reminder has already gone out.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoice_reminders)]
pub struct InvoiceReminderEntity {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub threshold_days: i32,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoice_reminders)]
pub struct InsertInvoiceReminderEntity {
    pub invoice_id: Uuid,
    pub threshold_days: i32,
}
