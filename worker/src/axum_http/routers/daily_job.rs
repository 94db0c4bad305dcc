use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::error;

use crate::{config::config_model::DotEnvyConfig, usecases::daily_job::DailyJobUseCase};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/jobs/daily" \
//     -H "Authorization: Bearer $INTERNAL_JOBS_TOKEN"

#[derive(Clone)]
pub struct DailyJobRouteState {
    config: Arc<DotEnvyConfig>,
    usecase: Arc<DailyJobUseCase>,
}

pub fn routes(config: Arc<DotEnvyConfig>, usecase: Arc<DailyJobUseCase>) -> Router {
    Router::new()
        .route("/daily", post(run_daily_job))
        .with_state(DailyJobRouteState { config, usecase })
}

pub async fn run_daily_job(State(state): State<DailyJobRouteState>, headers: HeaderMap) -> Response {
    let expected_token = match state.config.jobs.internal_token.as_deref() {
        Some(token) => token,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "jobs token is not configured",
            )
                .into_response();
        }
    };

    if let Err(status) = authorize_bearer(&headers, expected_token) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.run().await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            error!(error = ?err, "daily_job: manual run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "daily job failed").into_response()
        }
    }
}

fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if token == expected_token {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
