//! Health check endpoint — for load balancers, monitoring and container
//! health checks. Unauthenticated, no side effects.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    status: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/healthz", get(healthz).options(healthz))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_ok = signet_db::postgres::health_check(&state.db.pg).await;
    Json(HealthResponse {
        ok: true,
        status: if db_ok { "healthy".into() } else { "degraded".into() },
    })
}
