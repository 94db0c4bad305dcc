use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::orders;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub price_minor: i32,
    pub currency: String,
    pub billing_cycle: String,
    pub next_due_at: DateTime<Utc>,
    pub status: String,
    pub server_details: serde_json::Value,
    pub server_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub user_id: Uuid,
    pub price_minor: i32,
    pub currency: String,
    pub billing_cycle: String,
    pub next_due_at: DateTime<Utc>,
    pub status: String,
    pub server_details: serde_json::Value,
    pub server_id: Option<String>,
}
