//! Server discovery — resolves a bare server name to a reachable HTTPS base
//! URL plus the hostname to present in `Host` / TLS SNI.
//!
//! Resolution is a strict precedence chain; earlier rules win:
//!
//! 1. **IP literal** — `1.2.3.4[:port]` → use as-is (default port 8448)
//! 2. **Explicit port** — `server.tld:8448` → use as-is
//! 3. **`.well-known/matrix/server`** — follow the delegated address, itself
//!    resolved by IP literal → explicit port → SRV → default port
//! 4. **SRV** — `_matrix-fed._tcp`, then the deprecated `_matrix._tcp`
//! 5. **Direct HTTPS fallback** — `https://<name>:8448`
//!
//! Network failures during well-known / SRV steps are never fatal: each one
//! is an observable fall-through to the next rule, and the terminal rule
//! reached is recorded as a [`DiscoverySource`]. Results are cached in
//! memory with a 1-hour TTL.

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{error::FederationError, types::WellKnownServer};

/// Default federation port.
const DEFAULT_FED_PORT: u16 = 8448;

/// How long to cache a resolved address before re-resolving.
const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Entries older than this are dropped outright on the next write.
const CACHE_EVICT_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

/// The terminal rule a resolution ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    IpLiteral,
    ExplicitPort,
    WellKnownIpLiteral,
    WellKnownExplicitPort,
    WellKnownSrv,
    WellKnownSrvDeprecated,
    WellKnownFallback,
    Srv,
    SrvDeprecated,
    Fallback,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpLiteral => "ip-literal",
            Self::ExplicitPort => "explicit-port",
            Self::WellKnownIpLiteral => "well-known ip-literal",
            Self::WellKnownExplicitPort => "well-known explicit-port",
            Self::WellKnownSrv => "well-known srv",
            Self::WellKnownSrvDeprecated => "well-known srv (deprecated)",
            Self::WellKnownFallback => "well-known fallback",
            Self::Srv => "srv",
            Self::SrvDeprecated => "srv (deprecated)",
            Self::Fallback => "fallback",
        }
    }
}

/// A resolved federation endpoint.
#[derive(Debug, Clone)]
pub struct ResolvedServer {
    /// `https://host:port` to connect to.
    pub base_url: String,
    /// Hostname to present in the `Host` header / TLS SNI.
    pub host_header: String,
    /// Which rule produced this result.
    pub source: DiscoverySource,
}

#[derive(Debug)]
struct CacheEntry {
    resolved: ResolvedServer,
    resolved_at: Instant,
}

/// In-memory cache for resolved federation endpoints.
///
/// Thread-safe; constructed once at startup and shared via `Clone`.
#[derive(Clone)]
pub struct DiscoveryCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
    http: reqwest::Client,
    resolver: Arc<TokioAsyncResolver>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("signet/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build discovery http client");
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { inner: Arc::new(RwLock::new(HashMap::new())), http, resolver: Arc::new(resolver) }
    }

    /// Resolve `server_name`, using the cache when fresh.
    pub async fn resolve(&self, server_name: &str) -> Result<ResolvedServer, FederationError> {
        {
            let cache = self.inner.read().await;
            if let Some(entry) = cache.get(server_name) {
                if entry.resolved_at.elapsed() < CACHE_TTL {
                    debug!(
                        "Discovery cache hit: {} → {}",
                        server_name, entry.resolved.base_url
                    );
                    return Ok(entry.resolved.clone());
                }
            }
        }

        let resolved = self.do_resolve(server_name).await?;
        debug!(
            "Discovery: {} → {} (host {}, {})",
            server_name,
            resolved.base_url,
            resolved.host_header,
            resolved.source.as_str()
        );

        {
            let mut cache = self.inner.write().await;
            cache.retain(|_, e| e.resolved_at.elapsed() < CACHE_EVICT_AFTER);
            cache.insert(
                server_name.to_owned(),
                CacheEntry { resolved: resolved.clone(), resolved_at: Instant::now() },
            );
        }

        Ok(resolved)
    }

    /// Invalidate cache for a server (e.g. after a connection failure).
    pub async fn invalidate(&self, server_name: &str) {
        self.inner.write().await.remove(server_name);
    }

    // ── Resolution logic ─────────────────────────────────────────────────────

    async fn do_resolve(&self, server_name: &str) -> Result<ResolvedServer, FederationError> {
        let (host, port, default_port) = split_host_port(server_name)
            .ok_or_else(|| FederationError::Discovery {
                server: server_name.to_owned(),
                reason: "unparsable host/port".to_owned(),
            })?;

        // Rule 1: IP literal, explicit or default port — the queried name is
        // kept verbatim as the Host override.
        if host.parse::<IpAddr>().is_ok() {
            return Ok(ResolvedServer {
                base_url: format_base_url(&host, port),
                host_header: server_name.to_owned(),
                source: DiscoverySource::IpLiteral,
            });
        }

        // Rule 2: hostname with an explicit port.
        if !default_port {
            return Ok(ResolvedServer {
                base_url: format_base_url(&host, port),
                host_header: host,
                source: DiscoverySource::ExplicitPort,
            });
        }

        // Rule 3: bare hostname — consult .well-known.
        if let Some(resolved) = self.try_well_known(&host).await {
            return Ok(resolved);
        }

        // Rules 4–5: SRV on the original hostname, current then deprecated
        // service name.
        if let Some((target, srv_port)) = self.lookup_srv("_matrix-fed._tcp", &host).await {
            return Ok(ResolvedServer {
                base_url: format_base_url(&target, srv_port),
                host_header: host,
                source: DiscoverySource::Srv,
            });
        }
        if let Some((target, srv_port)) = self.lookup_srv("_matrix._tcp", &host).await {
            return Ok(ResolvedServer {
                base_url: format_base_url(&target, srv_port),
                host_header: host,
                source: DiscoverySource::SrvDeprecated,
            });
        }

        // Rule 6: the name as-is on the default port.
        Ok(ResolvedServer {
            base_url: format_base_url(&host, port),
            host_header: host,
            source: DiscoverySource::Fallback,
        })
    }

    /// Follow a `.well-known/matrix/server` delegation. `None` means "no
    /// usable delegation" — the caller falls through to SRV.
    async fn try_well_known(&self, host: &str) -> Option<ResolvedServer> {
        let url = format!("https://{host}/.well-known/matrix/server");
        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Well-known fetch for {} failed: {}", host, e);
                return None;
            }
        };
        if resp.status() != reqwest::StatusCode::OK {
            debug!("Well-known for {} returned {}", host, resp.status());
            return None;
        }
        let wk: WellKnownServer = match resp.json().await {
            Ok(wk) => wk,
            Err(e) => {
                debug!("Well-known body for {} unparsable: {}", host, e);
                return None;
            }
        };
        if wk.server.is_empty() {
            return None;
        }

        let (wk_host, wk_port, wk_default_port) = split_host_port(&wk.server)?;

        // Delegated IP literal: use as given, keep the full delegated
        // address as the Host override.
        if wk_host.parse::<IpAddr>().is_ok() {
            return Some(ResolvedServer {
                base_url: format_base_url(&wk_host, wk_port),
                host_header: wk.server.clone(),
                source: DiscoverySource::WellKnownIpLiteral,
            });
        }

        // Delegated host with an explicit port: use as given.
        if !wk_default_port {
            return Some(ResolvedServer {
                base_url: format_base_url(&wk_host, wk_port),
                host_header: wk_host,
                source: DiscoverySource::WellKnownExplicitPort,
            });
        }

        // Portless delegation: SRV on the delegated host, then default port.
        if let Some((target, srv_port)) = self.lookup_srv("_matrix-fed._tcp", &wk_host).await {
            return Some(ResolvedServer {
                base_url: format_base_url(&target, srv_port),
                host_header: wk_host,
                source: DiscoverySource::WellKnownSrv,
            });
        }
        if let Some((target, srv_port)) = self.lookup_srv("_matrix._tcp", &wk_host).await {
            return Some(ResolvedServer {
                base_url: format_base_url(&target, srv_port),
                host_header: wk_host,
                source: DiscoverySource::WellKnownSrvDeprecated,
            });
        }

        Some(ResolvedServer {
            base_url: format_base_url(&wk_host, wk_port),
            host_header: wk_host,
            source: DiscoverySource::WellKnownFallback,
        })
    }

    /// First SRV record for `<service>.<host>`, with any trailing root-label
    /// dot stripped from the target. Lookup failures are fall-throughs.
    async fn lookup_srv(&self, service: &str, host: &str) -> Option<(String, u16)> {
        let name = format!("{service}.{host}.");
        let lookup = match self.resolver.srv_lookup(name.as_str()).await {
            Ok(l) => l,
            Err(e) => {
                debug!("SRV {}.{} lookup failed: {}", service, host, e);
                return None;
            }
        };
        let record = lookup.iter().next()?;
        let mut target = record.target().to_utf8();
        if target.ends_with('.') {
            target.pop();
        }
        if target.is_empty() {
            return None;
        }
        Some((target, record.port()))
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Split a server name into host and port. Returns `(host, port,
/// default_port_used)`, or `None` if the name cannot be split.
fn split_host_port(server_name: &str) -> Option<(String, u16, bool)> {
    if server_name.is_empty() {
        return None;
    }

    // Bracketed IPv6 literal: [::1] or [::1]:8448
    if let Some(rest) = server_name.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        if after.is_empty() {
            return Some((host.to_owned(), DEFAULT_FED_PORT, true));
        }
        let port = after.strip_prefix(':')?.parse().ok()?;
        return Some((host.to_owned(), port, false));
    }

    match server_name.matches(':').count() {
        0 => Some((server_name.to_owned(), DEFAULT_FED_PORT, true)),
        1 => {
            let (host, port) = server_name.split_once(':')?;
            let port = port.parse().ok()?;
            Some((host.to_owned(), port, false))
        }
        // Multiple colons with no brackets: a bare IPv6 address.
        _ => Some((server_name.to_owned(), DEFAULT_FED_PORT, true)),
    }
}

/// Form an HTTPS base URL, re-bracketing IPv6 hosts.
fn format_base_url(host: &str, port: u16) -> String {
    if host.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_hostname_without_port() {
        assert_eq!(
            split_host_port("example.com"),
            Some(("example.com".to_owned(), 8448, true))
        );
    }

    #[test]
    fn split_hostname_with_port() {
        assert_eq!(
            split_host_port("example.com:443"),
            Some(("example.com".to_owned(), 443, false))
        );
    }

    #[test]
    fn split_ipv6_forms() {
        assert_eq!(split_host_port("[::1]"), Some(("::1".to_owned(), 8448, true)));
        assert_eq!(split_host_port("[::1]:9000"), Some(("::1".to_owned(), 9000, false)));
        assert_eq!(split_host_port("::1"), Some(("::1".to_owned(), 8448, true)));
    }

    #[test]
    fn split_rejects_garbage() {
        assert_eq!(split_host_port(""), None);
        assert_eq!(split_host_port("example.com:notaport"), None);
        assert_eq!(split_host_port("[::1"), None);
    }

    #[test]
    fn ipv6_urls_are_bracketed() {
        assert_eq!(format_base_url("::1", 8448), "https://[::1]:8448");
        assert_eq!(format_base_url("1.2.3.4", 8448), "https://1.2.3.4:8448");
    }

    #[tokio::test]
    async fn ip_literal_with_port_is_terminal() {
        // Must resolve without touching well-known or SRV.
        let cache = DiscoveryCache::new();
        let resolved = cache.resolve("1.2.3.4:9000").await.unwrap();
        assert_eq!(resolved.base_url, "https://1.2.3.4:9000");
        assert_eq!(resolved.host_header, "1.2.3.4:9000");
        assert_eq!(resolved.source, DiscoverySource::IpLiteral);
    }

    #[tokio::test]
    async fn ip_literal_without_port_uses_default() {
        let cache = DiscoveryCache::new();
        let resolved = cache.resolve("10.0.0.7").await.unwrap();
        assert_eq!(resolved.base_url, "https://10.0.0.7:8448");
        assert_eq!(resolved.host_header, "10.0.0.7");
        assert_eq!(resolved.source, DiscoverySource::IpLiteral);
    }

    #[tokio::test]
    async fn ipv6_literal_is_terminal() {
        let cache = DiscoveryCache::new();
        let resolved = cache.resolve("[::1]:9000").await.unwrap();
        assert_eq!(resolved.base_url, "https://[::1]:9000");
        assert_eq!(resolved.host_header, "[::1]:9000");
        assert_eq!(resolved.source, DiscoverySource::IpLiteral);
    }

    #[tokio::test]
    async fn explicit_port_skips_well_known() {
        let cache = DiscoveryCache::new();
        let resolved = cache.resolve("example.com:4430").await.unwrap();
        assert_eq!(resolved.base_url, "https://example.com:4430");
        assert_eq!(resolved.host_header, "example.com");
        assert_eq!(resolved.source, DiscoverySource::ExplicitPort);
    }

    #[tokio::test]
    async fn results_are_cached() {
        let cache = DiscoveryCache::new();
        let first = cache.resolve("1.2.3.4:9000").await.unwrap();
        let second = cache.resolve("1.2.3.4:9000").await.unwrap();
        assert_eq!(first.base_url, second.base_url);
        assert_eq!(first.host_header, second.host_header);
    }

    #[tokio::test]
    async fn unparsable_name_is_a_discovery_error() {
        let cache = DiscoveryCache::new();
        let err = cache.resolve("example.com:notaport").await.unwrap_err();
        assert!(matches!(err, FederationError::Discovery { .. }));
    }
}
