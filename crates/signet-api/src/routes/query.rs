//! Notary query endpoints.
//!
//! `GET /_matrix/key/v2/query/{server_name}[/{key_id}]` and
//! `POST /_matrix/key/v2/query` — resolve one or many remote servers' keys
//! and return them notarized (peer + local signatures).

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signet_common::time::now_millis;
use signet_common::{ApiError, ApiResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use crate::{notary, AppState};

#[derive(Serialize)]
struct BatchedServerKeys {
    server_keys: Vec<Value>,
}

#[derive(Deserialize)]
struct LookupCriteria {
    #[serde(default)]
    minimum_valid_until_ts: i64,
}

#[derive(Deserialize)]
struct BatchKeyLookup {
    #[serde(default)]
    server_keys: HashMap<String, HashMap<String, LookupCriteria>>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/_matrix/key/v2/query/{server_name}", get(query_single))
        .route("/_matrix/key/v2/query/{server_name}/{key_id}", get(query_single_with_key))
        .route("/_matrix/key/v2/query", post(query_batch))
}

async fn query_single(
    State(state): State<Arc<AppState>>,
    Path(server_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<BatchedServerKeys>> {
    respond_single(&state, &server_name, &params).await
}

async fn query_single_with_key(
    State(state): State<Arc<AppState>>,
    Path((server_name, _key_id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<BatchedServerKeys>> {
    respond_single(&state, &server_name, &params).await
}

async fn respond_single(
    state: &AppState,
    server_name: &str,
    params: &HashMap<String, String>,
) -> ApiResult<Json<BatchedServerKeys>> {
    let min_valid_ts = match params.get("minimum_valid_until_ts") {
        Some(raw) => raw.parse::<i64>().map_err(|e| {
            error!("Bad minimum_valid_until_ts {raw:?}: {e}");
            ApiError::BadRequest("invalid minimum timestamp".into())
        })?,
        None => now_millis(),
    };

    let expanded = notary::find_and_prepare_keys(state, server_name, min_valid_ts).await?;
    Ok(Json(BatchedServerKeys { server_keys: vec![Value::Object(expanded)] }))
}

async fn query_batch(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<BatchedServerKeys>> {
    let lookup: BatchKeyLookup = serde_json::from_str(&body).map_err(|e| {
        error!("Unparsable batch key lookup: {e}");
        ApiError::BadRequest("Body not JSON".into())
    })?;

    let mut server_keys = Vec::new();
    for (domain, searches) in &lookup.server_keys {
        // The strictest validity floor requested for any key of this domain.
        let mut min_valid_ts =
            searches.values().map(|c| c.minimum_valid_until_ts).max().unwrap_or(0);
        if min_valid_ts <= 0 {
            min_valid_ts = now_millis();
        }

        let expanded = notary::find_and_prepare_keys(&state, domain, min_valid_ts).await?;
        server_keys.push(Value::Object(expanded));
    }

    Ok(Json(BatchedServerKeys { server_keys }))
}
