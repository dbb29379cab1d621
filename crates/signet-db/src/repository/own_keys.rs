//! CRUD for this server's own signing keys (`self_keys`).
//!
//! Keys are write-once: a key is inserted active (`expires_ts = 0`) and the
//! only later mutation is retiring it by setting a non-zero expiry. Retired
//! rows stay forever so old signatures remain checkable.

use anyhow::Result;
use signet_common::models::keys::OwnKey;
use sqlx::PgPool;

/// All keys this server has ever used, active and retired.
pub async fn all(pool: &PgPool) -> Result<Vec<OwnKey>> {
    let rows = sqlx::query_as::<_, OwnKey>(
        "SELECT key_id, public_key_b64, private_key_b64, expires_ts FROM self_keys",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// IDs of the currently active keys (`expires_ts = 0`).
pub async fn active_ids(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT key_id FROM self_keys WHERE expires_ts = 0",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Find a single key by ID.
pub async fn get(pool: &PgPool, key_id: &str) -> Result<Option<OwnKey>> {
    let row = sqlx::query_as::<_, OwnKey>(
        "SELECT key_id, public_key_b64, private_key_b64, expires_ts \
         FROM self_keys WHERE key_id = $1",
    )
    .bind(key_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a freshly generated active key.
pub async fn insert_active(
    pool: &PgPool,
    key_id: &str,
    public_key_b64: &str,
    private_key_b64: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO self_keys (key_id, public_key_b64, private_key_b64) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (key_id) DO NOTHING",
    )
    .bind(key_id)
    .bind(public_key_b64)
    .bind(private_key_b64)
    .execute(pool)
    .await?;
    Ok(())
}
