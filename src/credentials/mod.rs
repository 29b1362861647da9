//! Short-lived credential subsystem.
//!
//! # Data Flow
//! ```text
//! Caller needs a storage client for zone Z
//!     → cache.rs (lock slot, check expiry and zone)
//!         ├─ fresh, same zone  → return shared pair
//!         ├─ fresh, new zone   → factory.build(existing credential, Z)
//!         └─ missing/expiring  → issuer.issue(ttl) → factory.build(new, Z)
//! ```
//!
//! # Design Decisions
//! - Issuer and factory are traits so the cache can be tested without a network
//! - Secrets are redacted from `Debug` output

pub mod cache;
pub mod issuer;
pub mod types;

pub use cache::{CachedClient, ExpiringResourceCache};
pub use issuer::HttpCredentialIssuer;
pub use types::{ClientFactory, CredentialError, CredentialIssuer, CredentialResult, StaticCredential};
