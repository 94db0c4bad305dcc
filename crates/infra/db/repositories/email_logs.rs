use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::email_logs},
};
use domain::{
    entities::email_logs::InsertEmailLogEntity, repositories::email_logs::EmailLogRepository,
};

pub struct EmailLogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EmailLogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EmailLogRepository for EmailLogPostgres {
    async fn record_email(&self, entry: InsertEmailLogEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let log_id = insert_into(email_logs::table)
            .values(&entry)
            .returning(email_logs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(log_id)
    }
}
