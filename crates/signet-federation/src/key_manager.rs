//! DB-backed provisioning of this server's signing key.
//!
//! On startup, `KeyManager::load_or_generate` queries `self_keys` for an
//! active key (`expires_ts = 0`). If none exists (first boot), it generates
//! a fresh Ed25519 pair, persists it, and returns it. Called exactly once
//! from `main`; the returned `Arc` is immutable for the process lifetime.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use signet_db::{repository::own_keys, Database};
use signet_signing::SigningKeyPair;
use tracing::{info, warn};

/// Loads or provisions this server's Ed25519 signing key.
#[derive(Debug)]
pub struct KeyManager {
    db: Database,
}

impl KeyManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the active signing key, generating and persisting one on
    /// first boot.
    pub async fn load_or_generate(&self) -> Result<Arc<SigningKeyPair>> {
        let active = own_keys::active_ids(&self.db.pg).await?;

        if let Some(key_id) = active.first() {
            let key = own_keys::get(&self.db.pg, key_id)
                .await?
                .ok_or_else(|| anyhow!("active key {} vanished from storage", key_id))?;
            let kp = SigningKeyPair::from_base64_seed(key.key_id.clone(), &key.private_key_b64)?;
            info!("Loaded active signing key {}", kp.key_id);
            return Ok(Arc::new(kp));
        }

        warn!("No active signing key for this server — generating a new Ed25519 key pair");
        let kp = SigningKeyPair::generate();
        own_keys::insert_active(
            &self.db.pg,
            &kp.key_id,
            &kp.public_key_base64(),
            &kp.seed_base64(),
        )
        .await?;
        info!("Generated and persisted new signing key {}", kp.key_id);
        Ok(Arc::new(kp))
    }
}
