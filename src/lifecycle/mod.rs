//! Resource lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! Single resource (converge.rs):
//!     mutate via API → poll status until ready / gone
//!
//! Bulk cleanup (cleanup.rs):
//!     list → filter by prefix → worker pool of delete_and_wait
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Ctrl-C → cancel root token → every child wait returns Cancelled
//! ```
//!
//! # Design Decisions
//! - Every operation takes a cancellation token; none spawn detached work
//! - Wait timeouts come from `[polling]` config

pub mod cleanup;
pub mod converge;
pub mod shutdown;
pub mod signals;

pub use cleanup::{BulkCleanup, CleanupError, CleanupReport};
pub use converge::{gone_target, ready_target, LifecycleError, LifecycleResult, ResourceLifecycle};
pub use shutdown::Shutdown;
pub use signals::listen_for_ctrl_c;
