//! The remote key cache persistence boundary.
//!
//! [`KeyStore`] is the seam between the key resolver and storage: the
//! resolver only ever sees this trait, so its refresh logic can be driven
//! against an in-memory store in tests. [`PgKeyStore`] is the production
//! implementation.
//!
//! Child rows (`remote_keys`, `remote_signatures`) are replaced wholesale —
//! delete then reinsert — on every successful refresh of a server's key
//! document.

use anyhow::Result;
use async_trait::async_trait;
use signet_common::models::keys::{RemoteKey, RemoteServer, RemoteSignature};
use sqlx::PgPool;

/// Storage operations for the remote key cache.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get_remote_server(&self, server_name: &str) -> Result<Option<RemoteServer>>;
    async fn upsert_remote_server(&self, server: &RemoteServer) -> Result<()>;
    async fn delete_remote_keys(&self, server_name: &str) -> Result<()>;
    async fn delete_remote_signatures(&self, server_name: &str) -> Result<()>;
    async fn add_remote_key(&self, key: &RemoteKey) -> Result<()>;
    async fn add_remote_signature(&self, sig: &RemoteSignature) -> Result<()>;
    async fn get_remote_keys(&self, server_name: &str) -> Result<Vec<RemoteKey>>;
    async fn get_remote_signatures(&self, server_name: &str) -> Result<Vec<RemoteSignature>>;
}

/// PostgreSQL-backed [`KeyStore`].
#[derive(Debug, Clone)]
pub struct PgKeyStore {
    pool: PgPool,
}

impl PgKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn get_remote_server(&self, server_name: &str) -> Result<Option<RemoteServer>> {
        let row = sqlx::query_as::<_, RemoteServer>(
            "SELECT server_name, updated_ts, valid_until_ts, nonstandard_json \
             FROM remote_servers WHERE server_name = $1",
        )
        .bind(server_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_remote_server(&self, server: &RemoteServer) -> Result<()> {
        sqlx::query(
            "INSERT INTO remote_servers (server_name, updated_ts, valid_until_ts, nonstandard_json) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (server_name) DO UPDATE SET \
                 updated_ts = EXCLUDED.updated_ts, \
                 valid_until_ts = EXCLUDED.valid_until_ts, \
                 nonstandard_json = EXCLUDED.nonstandard_json",
        )
        .bind(&server.server_name)
        .bind(server.updated_ts)
        .bind(server.valid_until_ts)
        .bind(&server.nonstandard_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_remote_keys(&self, server_name: &str) -> Result<()> {
        sqlx::query("DELETE FROM remote_keys WHERE server_name = $1")
            .bind(server_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_remote_signatures(&self, server_name: &str) -> Result<()> {
        sqlx::query("DELETE FROM remote_signatures WHERE server_name = $1")
            .bind(server_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_remote_key(&self, key: &RemoteKey) -> Result<()> {
        sqlx::query(
            "INSERT INTO remote_keys (server_name, key_id, public_key_b64, expires_ts) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (server_name, key_id) DO UPDATE SET \
                 public_key_b64 = EXCLUDED.public_key_b64, \
                 expires_ts = EXCLUDED.expires_ts",
        )
        .bind(&key.server_name)
        .bind(&key.key_id)
        .bind(&key.public_key_b64)
        .bind(key.expires_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_remote_signature(&self, sig: &RemoteSignature) -> Result<()> {
        sqlx::query(
            "INSERT INTO remote_signatures (server_name, key_id, signature_b64) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (server_name, key_id) DO UPDATE SET \
                 signature_b64 = EXCLUDED.signature_b64",
        )
        .bind(&sig.server_name)
        .bind(&sig.key_id)
        .bind(&sig.signature_b64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_remote_keys(&self, server_name: &str) -> Result<Vec<RemoteKey>> {
        let rows = sqlx::query_as::<_, RemoteKey>(
            "SELECT server_name, key_id, public_key_b64, expires_ts \
             FROM remote_keys WHERE server_name = $1",
        )
        .bind(server_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_remote_signatures(&self, server_name: &str) -> Result<Vec<RemoteSignature>> {
        let rows = sqlx::query_as::<_, RemoteSignature>(
            "SELECT server_name, key_id, signature_b64 \
             FROM remote_signatures WHERE server_name = $1",
        )
        .bind(server_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
