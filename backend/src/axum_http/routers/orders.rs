use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::infra::db::{
    postgres::postgres_connection::PgPoolSquad, repositories::orders::OrderPostgres,
};
use uuid::Uuid;

use crate::{auth::AuthUser, usecases::orders_query::OrdersQueryUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let order_repo = Arc::new(OrderPostgres::new(Arc::clone(&db_pool)));
    let usecase = OrdersQueryUseCase::new(order_repo);

    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
        .with_state(Arc::new(usecase))
}

pub async fn list_orders(
    State(usecase): State<Arc<OrdersQueryUseCase<OrderPostgres>>>,
    auth: AuthUser,
) -> impl IntoResponse {
    match usecase.list_orders(auth.user_id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}

pub async fn get_order(
    State(usecase): State<Arc<OrdersQueryUseCase<OrderPostgres>>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse {
    match usecase
        .get_order(auth.user_id, order_id, auth.is_admin())
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(err) => (err.status_code(), err.to_string()).into_response(),
    }
}
