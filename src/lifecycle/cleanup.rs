//! Bulk deletion of resources matching a name prefix.
//!
//! # Data Flow
//! ```text
//! list(kind) → filter by prefix → bounded queue → N workers
//!     worker: delete_and_wait(id) ─┬─ ok    → record
//!                                  └─ error → cancel siblings, report
//! ```
//!
//! # Design Decisions
//! - All workers share one child token of the caller's token
//! - The first real failure wins; cancellations it causes are not reported

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ResourceKind};
use crate::config::CleanupConfig;
use crate::lifecycle::converge::{LifecycleError, ResourceLifecycle};
use crate::observability::metrics;

/// Errors from a cleanup run.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("failed to list {kind} resources: {source}")]
    List {
        kind: ResourceKind,
        #[source]
        source: ApiError,
    },

    #[error("failed to delete {id}: {source}")]
    Delete {
        id: String,
        #[source]
        source: LifecycleError,
    },

    #[error("cleanup cancelled")]
    Cancelled,

    #[error("cleanup worker panicked: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Outcome of a successful cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ids removed, in completion order.
    pub deleted: Vec<String>,
    /// Resources listed but not matching the prefix.
    pub skipped: usize,
}

/// Deletes every resource of a kind whose name starts with a prefix.
#[derive(Debug, Clone)]
pub struct BulkCleanup {
    lifecycle: Arc<ResourceLifecycle>,
    workers: usize,
    queue_depth: usize,
}

impl BulkCleanup {
    pub fn new(lifecycle: Arc<ResourceLifecycle>, config: &CleanupConfig) -> Self {
        Self {
            lifecycle,
            workers: config.workers.max(1),
            queue_depth: config.queue_depth.max(1),
        }
    }

    /// Delete all `kind` resources named `prefix*` and wait for each to go.
    pub async fn run(
        &self,
        kind: ResourceKind,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<CleanupReport, CleanupError> {
        let cancel = cancel.child_token();

        let resources = self
            .lifecycle
            .api()
            .list(kind, &cancel)
            .await
            .map_err(|source| {
                if source.is_cancelled() {
                    CleanupError::Cancelled
                } else {
                    CleanupError::List { kind, source }
                }
            })?;

        let total = resources.len();
        let ids: Vec<String> = resources
            .into_iter()
            .filter(|r| r.name.starts_with(prefix))
            .map(|r| r.id)
            .collect();
        let skipped = total - ids.len();

        tracing::info!(
            kind = %kind,
            prefix = %prefix,
            matched = ids.len(),
            skipped = skipped,
            workers = self.workers,
            "Starting cleanup"
        );

        if ids.is_empty() {
            return Ok(CleanupReport {
                deleted: Vec::new(),
                skipped,
            });
        }

        let (tx, rx) = mpsc::channel::<String>(self.queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers.min(ids.len()) {
            let lifecycle = self.lifecycle.clone();
            let rx = rx.clone();
            let cancel = cancel.clone();
            workers.spawn(async move { worker(worker_id, lifecycle, kind, rx, cancel).await });
        }
        drop(rx);

        for id in ids {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(id) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(tx);

        let mut deleted = Vec::new();
        let mut failure: Option<CleanupError> = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(ids)) => deleted.extend(ids),
                Ok(Err((ids, error))) => {
                    deleted.extend(ids);
                    let replace = match (&failure, &error) {
                        (None, _) => true,
                        (Some(CleanupError::Cancelled), e) => !matches!(e, CleanupError::Cancelled),
                        _ => false,
                    };
                    if replace {
                        failure = Some(error);
                    }
                }
                Err(e) => {
                    cancel.cancel();
                    if failure.is_none() || matches!(failure, Some(CleanupError::Cancelled)) {
                        failure = Some(CleanupError::Worker(e));
                    }
                }
            }
        }

        tracing::info!(kind = %kind, deleted = deleted.len(), "Cleanup finished");

        if let Some(error) = failure {
            return Err(error);
        }
        if cancel.is_cancelled() {
            return Err(CleanupError::Cancelled);
        }
        Ok(CleanupReport { deleted, skipped })
    }
}

type WorkerResult = Result<Vec<String>, (Vec<String>, CleanupError)>;

async fn worker(
    worker_id: usize,
    lifecycle: Arc<ResourceLifecycle>,
    kind: ResourceKind,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    cancel: CancellationToken,
) -> WorkerResult {
    let mut deleted = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err((deleted, CleanupError::Cancelled)),
            next = async { rx.lock().await.recv().await } => next,
        };
        let Some(id) = next else {
            return Ok(deleted);
        };

        match lifecycle.delete_and_wait(kind, &id, &cancel).await {
            Ok(_) => {
                metrics::record_cleanup_deleted(kind.label());
                tracing::debug!(worker = worker_id, id = %id, "Resource removed");
                deleted.push(id);
            }
            Err(source) if source.is_cancelled() => {
                return Err((deleted, CleanupError::Cancelled));
            }
            Err(source) => {
                tracing::warn!(worker = worker_id, id = %id, error = %source, "Delete failed, stopping cleanup");
                cancel.cancel();
                return Err((deleted, CleanupError::Delete { id, source }));
            }
        }
    }
}
