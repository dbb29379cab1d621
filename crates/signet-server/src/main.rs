//! # Signet Server
//!
//! Federation trust server: owns this server's Ed25519 signing keys, serves
//! them over the key-exchange API, and resolves + notarizes other servers'
//! keys through a freshness-aware cache.

use signet_api::{build_router, AppState};
use signet_db::{Database, PgKeyStore};
use signet_federation::{DiscoveryCache, FederationClient, KeyManager, KeyResolver};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = signet_common::config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signet=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Signet v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Signing domain: {}", config.server.name);

    // Connect to the database and run migrations
    let db = Database::connect(config).await?;
    db.migrate().await?;

    // Load the active Ed25519 key from DB, or generate + persist a new one
    // on first run. Done exactly once, here; the key is immutable afterwards.
    let signing_key = KeyManager::new(db.clone()).load_or_generate().await?;
    tracing::info!("Signing key ready: {}", signing_key.key_id);

    // Remote key resolution: shared discovery cache + federated client +
    // DB-backed key cache.
    let discovery = DiscoveryCache::new();
    let fetcher = Arc::new(FederationClient::new(discovery));
    let store = Arc::new(PgKeyStore::new(db.pg.clone()));
    let key_resolver = Arc::new(KeyResolver::new(store, fetcher));

    let state = AppState {
        db: db.clone(),
        server_name: config.server.name.clone(),
        signing_key,
        key_resolver,
    };
    let router = build_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
