//! Mutate-then-wait resource operations.
//!
//! # Responsibilities
//! - Pair every create/update/delete with the matching convergence wait
//! - Derive poll targets from the resource kind
//!
//! # Design Decisions
//! - A delete keeps polling while the resource still reports a ready state;
//!   the API is eventually consistent and may not show `DELETING` at once
//! - A delete also keeps polling a `FAILED` resource until it disappears
//! - While waiting for ready, `FAILED` and unknown states end the wait as unexpected

use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ControlPlaneClient, Resource, ResourceKind, ResourceStatus};
use crate::polling::{ConvergencePoller, Converged, Observation, PollError, PollTarget, SampleError};

/// Errors from lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Poll(#[from] PollError),
}

impl LifecycleError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Api(e) => e.is_cancelled(),
            Self::Poll(e) => e.is_cancelled(),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Target for a resource that should settle into a ready state.
pub fn ready_target(kind: ResourceKind, timeout: Duration) -> PollTarget<ResourceStatus> {
    PollTarget::until_ready(kind.settling_states(), kind.ready_states(), timeout)
}

/// Target for a resource that should disappear.
pub fn gone_target(kind: ResourceKind, timeout: Duration) -> PollTarget<ResourceStatus> {
    let mut pending = kind.ready_states();
    pending.extend(kind.settling_states());
    pending.push(ResourceStatus::Deleting);
    pending.push(ResourceStatus::Failed);
    PollTarget::until_gone(pending, timeout)
}

/// Control plane client plus the poller that waits on its mutations.
#[derive(Debug, Clone)]
pub struct ResourceLifecycle {
    api: ControlPlaneClient,
    poller: ConvergencePoller,
    timeout: Duration,
}

impl ResourceLifecycle {
    pub fn new(api: ControlPlaneClient, poller: ConvergencePoller, timeout: Duration) -> Self {
        Self {
            api,
            poller,
            timeout,
        }
    }

    pub fn api(&self) -> &ControlPlaneClient {
        &self.api
    }

    /// Create a resource and wait until it is ready.
    pub async fn create_and_wait(
        &self,
        kind: ResourceKind,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Resource> {
        let mut resource = self.api.create(kind, body, cancel).await?;
        tracing::info!(kind = %kind, id = %resource.id, "Create accepted, waiting for ready state");

        let converged = self.wait_ready(kind, &resource.id, cancel).await?;
        if let Observation::Present(status) = converged.observation {
            resource.status = status;
        }
        Ok(resource)
    }

    /// Update a resource and wait until it is ready again.
    pub async fn update_and_wait(
        &self,
        kind: ResourceKind,
        id: &str,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Resource> {
        let mut resource = self.api.update(kind, id, body, cancel).await?;
        tracing::info!(kind = %kind, id = %id, "Update accepted, waiting for ready state");

        let converged = self.wait_ready(kind, id, cancel).await?;
        if let Observation::Present(status) = converged.observation {
            resource.status = status;
        }
        Ok(resource)
    }

    /// Delete a resource and wait until it is gone.
    pub async fn delete_and_wait(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Converged<ResourceStatus>> {
        self.api.delete(kind, id, cancel).await?;
        tracing::info!(kind = %kind, id = %id, "Delete accepted, waiting for removal");
        self.wait_gone(kind, id, cancel).await
    }

    /// Wait for an existing resource to reach a ready state.
    pub async fn wait_ready(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Converged<ResourceStatus>> {
        let target = ready_target(kind, self.timeout);
        self.wait(kind, id, &target, cancel).await
    }

    /// Wait for a resource to disappear.
    pub async fn wait_gone(
        &self,
        kind: ResourceKind,
        id: &str,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Converged<ResourceStatus>> {
        let target = gone_target(kind, self.timeout);
        self.wait(kind, id, &target, cancel).await
    }

    async fn wait(
        &self,
        kind: ResourceKind,
        id: &str,
        target: &PollTarget<ResourceStatus>,
        cancel: &CancellationToken,
    ) -> LifecycleResult<Converged<ResourceStatus>> {
        let api = &self.api;
        let sample = move || async move {
            api.get(kind, id, cancel)
                .await
                .map_err(|e| Box::new(e) as SampleError)
        };

        let converged = self.poller.wait_for(sample, target, cancel).await?;
        tracing::info!(
            kind = %kind,
            id = %id,
            observation = %converged.observation,
            samples = converged.samples,
            elapsed = ?converged.elapsed,
            "Resource converged"
        );
        Ok(converged)
    }
}
