//! # signet-federation
//!
//! Everything that talks to other servers:
//!
//! - **Discovery** (`discovery.rs`): resolves a bare server name to an HTTPS
//!   base URL and a Host override via the IP / explicit-port / well-known /
//!   SRV precedence chain, with an in-memory TTL cache.
//! - **Client** (`client.rs`): the federated HTTP GET used to fetch a peer's
//!   key document, behind the [`KeyFetcher`] seam.
//! - **Key resolver** (`resolver.rs`): answers "what are server X's
//!   currently-trusted signing keys" — cache freshness, fetch, self-signature
//!   verification, persistence, and graceful degradation when a peer is dead.
//! - **Key manager** (`key_manager.rs`): loads or provisions this server's
//!   own signing key at startup.

pub mod client;
pub mod discovery;
pub mod error;
pub mod key_manager;
pub mod resolver;
pub mod types;

pub use client::{FederationClient, KeyFetcher};
pub use discovery::{DiscoveryCache, DiscoverySource, ResolvedServer};
pub use error::FederationError;
pub use key_manager::KeyManager;
pub use resolver::KeyResolver;
