//! Control plane API subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle / cleanup / credential issuer
//!     → client.rs (build request, auth header)
//!     → http::transport (retries)
//!     → types.rs (decode Resource / ResourceStatus, map errors)
//! ```
//!
//! # Design Decisions
//! - Resource kinds are a closed enum; adding one is a compile-time change
//! - Unknown statuses are preserved verbatim rather than rejected

pub mod client;
pub mod types;

pub use client::ControlPlaneClient;
pub use types::{ApiError, ApiResult, EndpointKind, Resource, ResourceKind, ResourceStatus};
