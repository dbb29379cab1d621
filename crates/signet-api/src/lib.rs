//! # signet-api
//!
//! HTTP layer for Signet. Thin axum handlers over the trust engine:
//! local key document, notary queries, inbound-auth verification, version
//! and health.

pub mod notary;
pub mod routes;

use axum::http::{header, HeaderValue};
use axum::Router;
use signet_common::ApiError;
use signet_db::Database;
use signet_federation::KeyResolver;
use signet_signing::SigningKeyPair;
use std::sync::Arc;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Public signing-domain name of this server (e.g. "keys.example.com").
    pub server_name: String,
    /// Active Ed25519 signing key, provisioned once at startup.
    pub signing_key: Arc<SigningKeyPair>,
    /// Resolver for remote servers' signing keys.
    pub key_resolver: Arc<KeyResolver>,
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::version::router())
        .merge(routes::keys::router())
        .merge(routes::query::router())
        .merge(routes::verify::router())
        .fallback(not_found)
        .layer(tower_http::set_header::SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("signet"),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(Arc::new(state))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
