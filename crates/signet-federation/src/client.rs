//! Federated HTTP fetching.
//!
//! A federated GET connects to the *resolved* address but presents the
//! *discovered* hostname in the `Host` header, so delegated deployments see
//! the name they expect and certificate checks run against the right host.
//!
//! [`KeyFetcher`] is the seam the key resolver consumes; tests script it,
//! production uses [`FederationClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;

use crate::{discovery::DiscoveryCache, error::FederationError};

/// Fixed timeout for outbound federation requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches a remote server's raw key document.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Resolve `server_name` and GET its `/_matrix/key/v2/server` document,
    /// returning the raw response body.
    async fn fetch_key_document(&self, server_name: &str) -> Result<String, FederationError>;
}

/// Production [`KeyFetcher`]: discovery + HTTPS.
#[derive(Clone)]
pub struct FederationClient {
    http: reqwest::Client,
    discovery: DiscoveryCache,
}

impl FederationClient {
    pub fn new(discovery: DiscoveryCache) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("signet/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build federation http client");
        Self { http, discovery }
    }
}

#[async_trait]
impl KeyFetcher for FederationClient {
    async fn fetch_key_document(&self, server_name: &str) -> Result<String, FederationError> {
        let resolved = self.discovery.resolve(server_name).await?;
        let url = format!("{}/_matrix/key/v2/server", resolved.base_url);
        debug!("Federated GET {} with host {}", url, resolved.host_header);

        let resp = self
            .http
            .get(&url)
            .header(header::HOST, &resolved.host_header)
            .send()
            .await
            .map_err(|e| FederationError::RemoteHttp {
                server: server_name.to_owned(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FederationError::RemoteHttp {
                server: server_name.to_owned(),
                reason: format!("unexpected status {}", resp.status()),
            });
        }

        resp.text().await.map_err(|e| FederationError::RemoteHttp {
            server: server_name.to_owned(),
            reason: e.to_string(),
        })
    }
}
