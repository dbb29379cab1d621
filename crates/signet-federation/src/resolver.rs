//! Remote key resolution.
//!
//! `KeyResolver::query` answers "what are server X's currently-trusted
//! signing keys" for a given acceptable-validity floor. The flow per
//! request:
//!
//! 1. **Cache lookup + freshness test** — serve the stored rows when the
//!    cached document still meets the request, is not past the midpoint of
//!    its declared lifetime, and was fetched within the last 7 days.
//! 2. **Fetch** — discover the peer and GET its key document. If discovery
//!    or transport fails: serve whatever cached rows exist regardless of
//!    freshness (stale fallback), else return an empty, now-stamped set so
//!    callers always get a well-formed result.
//! 3. **Verify + persist** — check the document's self-signature against its
//!    own declared keys (failure here is fatal, never downgraded to stale
//!    data), then replace the stored rows wholesale and return the fresh set.
//!
//! Concurrent misses for the same server are coalesced behind a per-name
//! guard; the losers re-check the cache and serve the winner's rows.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use signet_common::models::keys::{CachedRemoteKeys, RemoteKey, RemoteServer, RemoteSignature};
use signet_common::time::now_millis;
use signet_db::KeyStore;
use signet_signing::keypair::decode_verifying_key;
use signet_signing::{verify_signatures, PublicKeyMap};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::KeyFetcher;
use crate::error::FederationError;
use crate::types::ServerKeyResult;

/// A cached document older than this is never served fresh, no matter what
/// expiry the peer declared.
const MAX_CACHE_LIFETIME_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Top-level members of a key document defined by the key-exchange format;
/// anything else is preserved as a non-standard field.
const STANDARD_KEY_RESULT_FIELDS: [&str; 5] =
    ["server_name", "valid_until_ts", "verify_keys", "old_verify_keys", "signatures"];

/// Should a cached document still be served?
///
/// Fresh means all of: the peer-declared expiry covers the requested floor,
/// `now` has not passed the midpoint between fetch time and expiry, and the
/// fetch is within the 7-day cap.
pub fn cache_is_fresh(
    now: i64,
    updated_ts: i64,
    valid_until_ts: i64,
    min_valid_until_ts: i64,
) -> bool {
    let beyond_lifespan = now - updated_ts > MAX_CACHE_LIFETIME_MS;
    let halfway_dead = now > (updated_ts + valid_until_ts) / 2;
    let meets_request = valid_until_ts >= min_valid_until_ts;
    meets_request && !halfway_dead && !beyond_lifespan
}

/// Resolves and caches remote servers' signing keys.
pub struct KeyResolver {
    store: Arc<dyn KeyStore>,
    fetcher: Arc<dyn KeyFetcher>,
    /// Per-server-name guards coalescing concurrent refreshes.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyResolver {
    pub fn new(store: Arc<dyn KeyStore>, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self { store, fetcher, in_flight: Mutex::new(HashMap::new()) }
    }

    /// Return `server_name`'s signing keys, honouring `min_valid_until_ts`
    /// as the lowest acceptable peer-declared expiry.
    pub async fn query(
        &self,
        server_name: &str,
        min_valid_until_ts: i64,
    ) -> Result<CachedRemoteKeys, FederationError> {
        if let Some(server) = self.store.get_remote_server(server_name).await? {
            if cache_is_fresh(now_millis(), server.updated_ts, server.valid_until_ts, min_valid_until_ts)
            {
                debug!("Key cache hit for {}", server_name);
                return self.package_cached(server).await;
            }
        }

        // Cache miss or stale: coalesce with any refresh already under way
        // for this name.
        let guard = {
            let mut map = self.in_flight.lock().await;
            Arc::clone(map.entry(server_name.to_owned()).or_default())
        };
        let _held = guard.lock().await;

        // Someone may have refreshed while we waited for the guard.
        if let Some(server) = self.store.get_remote_server(server_name).await? {
            if cache_is_fresh(now_millis(), server.updated_ts, server.valid_until_ts, min_valid_until_ts)
            {
                debug!("Key cache refreshed concurrently for {}", server_name);
                return self.package_cached(server).await;
            }
        }

        let body = match self.fetcher.fetch_key_document(server_name).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Key fetch for {} failed: {}", server_name, e);

                // Serve the last known response from the dead server…
                if let Some(server) = self.store.get_remote_server(server_name).await? {
                    debug!("Serving stale keys for {}", server_name);
                    return self.package_cached(server).await;
                }

                // …or, with nothing cached, an empty set stamped now.
                let now = now_millis();
                return Ok(CachedRemoteKeys {
                    server: RemoteServer {
                        server_name: server_name.to_owned(),
                        updated_ts: now,
                        valid_until_ts: now,
                        nonstandard_json: Value::Object(Map::new()),
                    },
                    keys: Vec::new(),
                    signatures: Vec::new(),
                });
            }
        };

        let (key_result, raw, nonstandard) = parse_key_document(server_name, &body)?;

        let public_keys = declared_public_keys(server_name, &key_result)?;
        verify_signatures(&Value::Object(raw), &public_keys).map_err(|e| {
            FederationError::VerificationFailed { server: server_name.to_owned(), source: e }
        })?;

        self.store_remote_keys(key_result, nonstandard).await
    }

    /// Read the full cached rows for a server's metadata record.
    async fn package_cached(
        &self,
        server: RemoteServer,
    ) -> Result<CachedRemoteKeys, FederationError> {
        let keys = self.store.get_remote_keys(&server.server_name).await?;
        let signatures = self.store.get_remote_signatures(&server.server_name).await?;
        Ok(CachedRemoteKeys { server, keys, signatures })
    }

    /// Replace the cached rows for a verified key document and return the
    /// freshly built set.
    async fn store_remote_keys(
        &self,
        key_result: ServerKeyResult,
        nonstandard: Map<String, Value>,
    ) -> Result<CachedRemoteKeys, FederationError> {
        let server = RemoteServer {
            server_name: key_result.server_name.clone(),
            updated_ts: now_millis(),
            valid_until_ts: key_result.valid_until_ts,
            nonstandard_json: Value::Object(nonstandard),
        };

        self.store.upsert_remote_server(&server).await?;
        self.store.delete_remote_keys(&server.server_name).await?;
        self.store.delete_remote_signatures(&server.server_name).await?;

        let mut keys = Vec::new();
        for (key_id, key) in &key_result.verify_keys {
            let row = RemoteKey {
                server_name: server.server_name.clone(),
                key_id: key_id.clone(),
                public_key_b64: key.key.clone(),
                expires_ts: 0,
            };
            self.store.add_remote_key(&row).await?;
            keys.push(row);
        }
        for (key_id, key) in &key_result.old_verify_keys {
            let row = RemoteKey {
                server_name: server.server_name.clone(),
                key_id: key_id.clone(),
                public_key_b64: key.key.clone(),
                expires_ts: key.expired_ts,
            };
            self.store.add_remote_key(&row).await?;
            keys.push(row);
        }

        let mut signatures = Vec::new();
        for domain_sigs in key_result.signatures.values() {
            for (key_id, signature) in domain_sigs {
                let row = RemoteSignature {
                    server_name: server.server_name.clone(),
                    key_id: key_id.clone(),
                    signature_b64: signature.clone(),
                };
                self.store.add_remote_signature(&row).await?;
                signatures.push(row);
            }
        }

        debug!(
            "Stored {} keys / {} signatures for {}",
            keys.len(),
            signatures.len(),
            server.server_name
        );
        Ok(CachedRemoteKeys { server, keys, signatures })
    }
}

/// Parse a raw key document body into its typed form, the raw object (the
/// exact bytes the peer signed), and the non-standard top-level fields.
fn parse_key_document(
    server_name: &str,
    body: &str,
) -> Result<(ServerKeyResult, Map<String, Value>, Map<String, Value>), FederationError> {
    let malformed = |reason: String| FederationError::MalformedResponse {
        server: server_name.to_owned(),
        reason,
    };

    let key_result: ServerKeyResult =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let raw: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let Value::Object(raw) = raw else {
        return Err(malformed("document is not a JSON object".to_owned()));
    };

    let mut nonstandard = Map::new();
    for (k, v) in &raw {
        if !STANDARD_KEY_RESULT_FIELDS.contains(&k.as_str()) {
            nonstandard.insert(k.clone(), v.clone());
        }
    }

    Ok((key_result, raw, nonstandard))
}

/// Build the public-key set a peer's document declares for itself, used to
/// check its self-signature.
fn declared_public_keys(
    server_name: &str,
    key_result: &ServerKeyResult,
) -> Result<PublicKeyMap, FederationError> {
    let mut by_id = HashMap::new();
    for (key_id, key) in &key_result.verify_keys {
        let vk = decode_verifying_key(&key.key).map_err(|e| FederationError::MalformedResponse {
            server: server_name.to_owned(),
            reason: format!("verify key {key_id}: {e}"),
        })?;
        by_id.insert(key_id.clone(), vk);
    }

    let mut keys = HashMap::new();
    keys.insert(key_result.server_name.clone(), by_id);
    Ok(keys)
}
