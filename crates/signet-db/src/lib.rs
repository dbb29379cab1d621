//! # signet-db
//!
//! Database layer for Signet. PostgreSQL holds this server's signing keys
//! (`self_keys`) and the verified remote key cache (`remote_servers`,
//! `remote_keys`, `remote_signatures`).

pub mod keystore;
pub mod postgres;
pub mod repository;

use anyhow::Result;
use sqlx::PgPool;

pub use keystore::{KeyStore, PgKeyStore};

/// Shared database state passed through Axum extractors.
#[derive(Debug, Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl Database {
    /// Connect to PostgreSQL.
    pub async fn connect(config: &signet_common::config::AppConfig) -> Result<Self> {
        tracing::info!("Connecting to PostgreSQL...");
        let pg = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        Ok(Self { pg })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pg).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }
}
