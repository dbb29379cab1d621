//! Federation version endpoint.

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct VersionResponse {
    server: ServerInfo,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/_matrix/federation/v1/version", get(version))
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        server: ServerInfo { name: "signet", version: env!("CARGO_PKG_VERSION") },
    })
}
