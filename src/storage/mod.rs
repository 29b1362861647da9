//! Object storage access.
//!
//! Clients are never constructed directly by callers; they come out of an
//! [`ExpiringResourceCache`](crate::credentials::ExpiringResourceCache) keyed
//! by [`ObjectStorageClientFactory`].

pub mod client;

pub use client::{
    ObjectStorageClient, ObjectStorageClientFactory, StorageError, StorageResult, X_ACCESS_KEY,
};
