use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub user_id: Uuid,
    pub gateway: String,
    pub amount_minor: i32,
    pub currency: String,
    pub transaction_ref: Option<String>,
    pub gateway_response: serde_json::Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub invoice_id: Option<Uuid>,
    pub user_id: Uuid,
    pub gateway: String,
    pub amount_minor: i32,
    pub currency: String,
    pub transaction_ref: Option<String>,
    pub gateway_response: serde_json::Value,
    pub status: String,
}

// NewPaymentEntity is the application-facing alias for inserting rows into `payments`.
pub type NewPaymentEntity = InsertPaymentEntity;
