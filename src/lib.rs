//! Cloud provider runtime library.
//!
//! Retry classification for outbound HTTP, expiring credential-bound client
//! caching, and convergence polling for eventually consistent resources.

pub mod api;
pub mod config;
pub mod credentials;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod polling;
pub mod resilience;
pub mod storage;

pub use api::ControlPlaneClient;
pub use config::schema::ProviderConfig;
pub use credentials::ExpiringResourceCache;
pub use http::RetryingTransport;
pub use lifecycle::{ResourceLifecycle, Shutdown};
pub use polling::ConvergencePoller;
pub use resilience::classify;
