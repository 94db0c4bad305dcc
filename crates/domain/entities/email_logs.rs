use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::email_logs;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = email_logs)]
pub struct EmailLogEntity {
    pub id: Uuid,
    pub action: String,
    pub recipient: String,
    pub subject: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = email_logs)]
pub struct InsertEmailLogEntity {
    pub action: String,
    pub recipient: String,
    pub subject: String,
    pub status: String,
    pub error_message: Option<String>,
}
