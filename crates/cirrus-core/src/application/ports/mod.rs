//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from the provisioning
//! backend. The `cirrus-adapters` crate provides implementations; the
//! backend's own semantics (rollback behaviour, resource-level retry)
//! stay behind this boundary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::MaterializedStack;

// ── Backend failure ───────────────────────────────────────────────────────────

/// An error surfaced by the provisioning backend (network, auth,
/// resource limits, template validation). The orchestrator maps every
/// such failure to the failing stack's `Failed` state; nothing is
/// retried at this layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct BackendError {
    pub reason: String,
}

impl BackendError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// ── Operation handle ──────────────────────────────────────────────────────────

/// Opaque identifier for an in-flight backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationHandle(Uuid);

impl OperationHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Status vocabulary ─────────────────────────────────────────────────────────

/// Remote stack status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    UpdateFailed,
}

impl StackStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            Self::RollbackFailed => "ROLLBACK_FAILED",
            Self::RollbackComplete => "ROLLBACK_COMPLETE",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::DeleteComplete => "DELETE_COMPLETE",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            Self::UpdateComplete => "UPDATE_COMPLETE",
            Self::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            Self::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            Self::UpdateRollbackCompleteCleanupInProgress => {
                "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"
            }
            Self::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            Self::UpdateFailed => "UPDATE_FAILED",
        }
    }

    /// `true` once the backend will not move the stack again on its own.
    pub const fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::CreateInProgress
                | Self::RollbackInProgress
                | Self::DeleteInProgress
                | Self::UpdateInProgress
                | Self::UpdateCompleteCleanupInProgress
                | Self::UpdateRollbackInProgress
                | Self::UpdateRollbackCompleteCleanupInProgress
        )
    }

    /// `true` for the terminal states that complete an operation
    /// successfully. Rollback-complete counts as failure: the requested
    /// change did not land.
    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            Self::CreateComplete | Self::UpdateComplete | Self::DeleteComplete
        )
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One status event from the backend's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    pub timestamp: DateTime<Utc>,
    pub stack_name: String,
    /// Resource-level status string; a superset of [`StackStatus`]
    /// (individual resources have their own vocabulary), so kept opaque.
    pub resource_status: String,
    pub resource_type: String,
    pub logical_id: String,
    pub physical_id: Option<String>,
    pub reason: Option<String>,
}

// ── Describe / request payloads ───────────────────────────────────────────────

/// Snapshot of one remote stack: status plus everything dependents can
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedStack {
    pub name: String,
    pub status: StackStatus,
    /// The template currently deployed, in canonical form; compared
    /// against the local template to detect an up-to-date stack.
    pub template_body: String,
    pub outputs: BTreeMap<String, String>,
    /// Logical resource ID → physical resource ID.
    pub resources: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
}

impl DescribedStack {
    /// Capture this snapshot as a materialized record for downstream
    /// reference resolution.
    pub fn materialize(&self) -> MaterializedStack {
        MaterializedStack {
            outputs: self.outputs.clone(),
            resources: self.resources.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Everything the backend needs to create or update one stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Physical (qualified) stack name.
    pub name: String,
    pub region: String,
    pub template_body: String,
    /// Fully-resolved literal parameters, in deterministic order.
    pub parameters: Vec<(String, String)>,
    pub tags: BTreeMap<String, String>,
    /// Notification topics the backend reports operation progress to.
    pub notify: Vec<String>,
}

// ── Port ──────────────────────────────────────────────────────────────────────

/// Port for the provisioning backend.
///
/// Implemented by:
/// - `cirrus_adapters::provisioner::InMemoryProvisioner` (local simulation, testing)
///
/// All operations are asynchronous on the backend side: the returned
/// handle only acknowledges submission. Callers observe completion by
/// polling [`Provisioner::describe_stack`] until the status is terminal.
#[cfg_attr(test, mockall::automock)]
pub trait Provisioner: Send + Sync {
    /// Submit stack creation.
    fn create_stack(&self, request: &ProvisionRequest) -> Result<OperationHandle, BackendError>;

    /// Submit a stack update.
    fn update_stack(&self, request: &ProvisionRequest) -> Result<OperationHandle, BackendError>;

    /// Submit stack deletion.
    fn delete_stack(&self, deployed_name: &str) -> Result<OperationHandle, BackendError>;

    /// Snapshot the remote stack, or `None` if it does not exist.
    fn describe_stack(&self, deployed_name: &str) -> Result<Option<DescribedStack>, BackendError>;

    /// Status events newer than `since`, oldest first. The stream is
    /// restartable: callers re-poll with the last seen timestamp.
    fn stack_events(
        &self,
        deployed_name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>, BackendError>;
}

// ── Event observer ────────────────────────────────────────────────────────────

/// Driving-side port: receives backend events as the orchestrator sees
/// them during a blocking wait or a watch. The CLI wires its status
/// printer here; the default observer discards everything.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &StackEvent);
}

/// Observer that ignores all events.
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn on_event(&self, _event: &StackEvent) {}
}
