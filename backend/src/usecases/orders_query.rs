use std::sync::Arc;

use chrono::{DateTime, Utc};
use crates::{
    domain::{entities::orders::OrderEntity, repositories::orders::OrderRepository},
    payments::qr_gateway::format_display_amount,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrdersQueryError {
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrdersQueryError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OrdersQueryError::NotFound => StatusCode::NOT_FOUND,
            OrdersQueryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: Uuid,
    pub status: String,
    pub price_minor: i32,
    pub display_amount: String,
    pub currency: String,
    pub billing_cycle: String,
    pub next_due_at: DateTime<Utc>,
    pub server_id: Option<String>,
    pub server_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<OrderEntity> for OrderDto {
    fn from(order: OrderEntity) -> Self {
        let display_amount = format_display_amount(order.price_minor, &order.currency);
        Self {
            id: order.id,
            status: order.status,
            price_minor: order.price_minor,
            display_amount,
            currency: order.currency,
            billing_cycle: order.billing_cycle,
            next_due_at: order.next_due_at,
            server_id: order.server_id,
            server_details: order.server_details,
            created_at: order.created_at,
        }
    }
}

/// Read side of the customer dashboard: a customer sees only their own
/// orders; admins can read any.
pub struct OrdersQueryUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
}

impl<O> OrdersQueryUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<O>) -> Self {
        Self { order_repo }
    }

    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderDto>, OrdersQueryError> {
        let orders = self.order_repo.list_by_user(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "orders query: failed to list orders");
            OrdersQueryError::Internal(err)
        })?;

        Ok(orders.into_iter().map(OrderDto::from).collect())
    }

    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        is_admin: bool,
    ) -> Result<OrderDto, OrdersQueryError> {
        let order = self
            .order_repo
            .find_by_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "orders query: failed to load order");
                OrdersQueryError::Internal(err)
            })?
            .ok_or(OrdersQueryError::NotFound)?;

        // Ownership check doubles as 404 so order ids are not probeable.
        if !is_admin && order.user_id != user_id {
            return Err(OrdersQueryError::NotFound);
        }

        Ok(OrderDto::from(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::orders::MockOrderRepository;
    use mockall::predicate::eq;

    fn make_order(user_id: Uuid) -> OrderEntity {
        OrderEntity {
            id: Uuid::new_v4(),
            user_id,
            price_minor: 1500,
            currency: "JPY".to_string(),
            billing_cycle: "monthly".to_string(),
            next_due_at: Utc::now(),
            status: "active".to_string(),
            server_details: serde_json::json!({}),
            server_id: Some("srv-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn other_customers_orders_read_as_not_found() {
        let owner = Uuid::new_v4();
        let order = make_order(owner);
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find_by_id()
            .with(eq(order_id))
            .returning(move |_| {
                let order = order.clone();
                Box::pin(async move { Ok(Some(order)) })
            });

        let usecase = OrdersQueryUseCase::new(Arc::new(orders));

        let err = usecase
            .get_order(Uuid::new_v4(), order_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, OrdersQueryError::NotFound));

        let dto = usecase.get_order(Uuid::new_v4(), order_id, true).await.unwrap();
        assert_eq!(dto.display_amount, "1500");
    }
}
