use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::invoices;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub number: i64,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub subtotal_minor: i32,
    pub tax_minor: i32,
    pub discount_minor: i32,
    pub total_minor: i32,
    pub currency: String,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub number: i64,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub subtotal_minor: i32,
    pub tax_minor: i32,
    pub discount_minor: i32,
    pub total_minor: i32,
    pub currency: String,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
