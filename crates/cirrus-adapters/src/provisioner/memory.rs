//! In-memory provisioner backend.
//!
//! A thread-safe simulated backend for offline runs and testing. Each
//! submitted operation holds its stack `*_IN_PROGRESS` for a
//! configurable number of describe calls (the settle ticks) before
//! settling, so the orchestrator's wait loop and the watch action are
//! exercised for real. Successful creates and updates synthesize
//! deterministic outputs and resources from the template's `Outputs`
//! and `Resources` sections, which lets cross-stack references resolve
//! end to end without any remote backend.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use cirrus_core::application::ports::{
    BackendError, DescribedStack, OperationHandle, Provisioner, ProvisionRequest, StackEvent,
    StackStatus,
};

use crate::template;

/// Simulated provisioning backend; cheap to clone, all clones share
/// state.
#[derive(Debug, Clone)]
pub struct InMemoryProvisioner {
    inner: Arc<RwLock<Inner>>,
    settle_ticks: u32,
}

#[derive(Debug, Default)]
struct Inner {
    stacks: HashMap<String, StackRecord>,
    /// Deployed names whose next operation settles in failure.
    fail_next: HashSet<String>,
}

#[derive(Debug)]
struct StackRecord {
    deployed_name: String,
    status: StackStatus,
    template_body: String,
    parameters: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
    resources: BTreeMap<String, String>,
    pending: Option<Pending>,
    remaining_ticks: u32,
    events: Vec<StackEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Create,
    Update,
    Delete,
}

impl InMemoryProvisioner {
    /// Create an empty backend that settles operations after one
    /// describe call, so one in-progress poll is always observable.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            settle_ticks: 1,
        }
    }

    /// Override how many describe calls an operation stays in progress.
    pub fn with_settle_ticks(mut self, ticks: u32) -> Self {
        self.settle_ticks = ticks;
        self
    }

    /// Make the next operation on `deployed_name` settle in failure
    /// (rollback for create/update, `DELETE_FAILED` for delete).
    pub fn fail_next_operation(&self, deployed_name: &str) {
        let mut inner = self.inner.write().expect("provisioner lock poisoned");
        inner.fail_next.insert(deployed_name.to_string());
    }

    /// Deployed names currently known to the backend (testing helper).
    pub fn stack_names(&self) -> Vec<String> {
        let inner = self.inner.read().expect("provisioner lock poisoned");
        let mut names: Vec<_> = inner.stacks.keys().cloned().collect();
        names.sort();
        names
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, BackendError> {
        self.inner
            .write()
            .map_err(|_| BackendError::new("backend state lock poisoned"))
    }

    /// Advance one stack's pending operation by one tick, settling it
    /// when the ticks are spent. Called from `describe_stack`, mirroring
    /// a remote backend that only makes progress visible when polled.
    fn tick(inner: &mut Inner, name: &str) {
        let pending = {
            let Some(record) = inner.stacks.get_mut(name) else {
                return;
            };
            let Some(pending) = record.pending else {
                return;
            };
            if record.remaining_ticks > 0 {
                record.remaining_ticks -= 1;
                return;
            }
            pending
        };
        let failed = inner.fail_next.remove(name);

        if pending == Pending::Delete && !failed {
            debug!(stack = name, "simulated delete settled");
            inner.stacks.remove(name);
            return;
        }

        let record = inner
            .stacks
            .get_mut(name)
            .expect("record existed at the start of this tick");
        match (pending, failed) {
            (Pending::Create, false) => {
                record.synthesize_values(name);
                record.settle(StackStatus::CreateComplete, None);
            }
            (Pending::Create, true) => {
                record.push_event(StackStatus::CreateFailed.as_str(), Some("injected failure"));
                record.settle(StackStatus::RollbackComplete, Some("create rolled back"));
            }
            (Pending::Update, false) => {
                record.synthesize_values(name);
                record.settle(StackStatus::UpdateComplete, None);
            }
            (Pending::Update, true) => {
                record.settle(
                    StackStatus::UpdateRollbackComplete,
                    Some("update rolled back"),
                );
            }
            (Pending::Delete, true) => {
                record.settle(StackStatus::DeleteFailed, Some("injected failure"));
            }
            (Pending::Delete, false) => unreachable!("handled above"),
        }
    }
}

impl Default for InMemoryProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl StackRecord {
    fn begin(request: &ProvisionRequest, pending: Pending, status: StackStatus, ticks: u32) -> Self {
        let mut record = Self {
            deployed_name: request.name.clone(),
            status,
            template_body: request.template_body.clone(),
            parameters: request.parameters.iter().cloned().collect(),
            tags: request.tags.clone(),
            outputs: BTreeMap::new(),
            resources: BTreeMap::new(),
            pending: Some(pending),
            remaining_ticks: ticks,
            events: Vec::new(),
        };
        record.push_event(status.as_str(), None);
        record
    }

    fn settle(&mut self, status: StackStatus, reason: Option<&str>) {
        self.status = status;
        self.pending = None;
        self.push_event(status.as_str(), reason);
    }

    /// Deterministic simulated values: one output per template `Outputs`
    /// key, one physical ID per `Resources` key.
    fn synthesize_values(&mut self, name: &str) {
        self.outputs = template::section_keys(&self.template_body, "Outputs")
            .into_iter()
            .map(|key| {
                let value = format!("sim-{name}-{key}");
                (key, value)
            })
            .collect();
        self.resources = template::section_keys(&self.template_body, "Resources")
            .into_iter()
            .map(|logical| {
                let physical = format!("sim-{name}-{logical}");
                (logical, physical)
            })
            .collect();
    }

    fn push_event(&mut self, status: &str, reason: Option<&str>) {
        self.events.push(StackEvent {
            timestamp: Utc::now(),
            stack_name: self.deployed_name.clone(),
            resource_status: status.to_string(),
            resource_type: "Cirrus::Stack".to_string(),
            logical_id: "stack".to_string(),
            physical_id: None,
            reason: reason.map(str::to_owned),
        });
    }

    fn describe(&self, name: &str) -> DescribedStack {
        DescribedStack {
            name: name.to_string(),
            status: self.status,
            template_body: self.template_body.clone(),
            outputs: self.outputs.clone(),
            resources: self.resources.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl Provisioner for InMemoryProvisioner {
    fn create_stack(&self, request: &ProvisionRequest) -> Result<OperationHandle, BackendError> {
        let mut inner = self.write()?;
        if inner.stacks.contains_key(&request.name) {
            return Err(BackendError::new(format!(
                "stack '{}' already exists",
                request.name
            )));
        }
        debug!(stack = %request.name, region = %request.region, "simulated create submitted");
        let record = StackRecord::begin(
            request,
            Pending::Create,
            StackStatus::CreateInProgress,
            self.settle_ticks,
        );
        inner.stacks.insert(request.name.clone(), record);
        Ok(OperationHandle::new())
    }

    fn update_stack(&self, request: &ProvisionRequest) -> Result<OperationHandle, BackendError> {
        let mut inner = self.write()?;
        let Some(existing) = inner.stacks.get(&request.name) else {
            return Err(BackendError::new(format!(
                "stack '{}' does not exist",
                request.name
            )));
        };
        if existing.pending.is_some() {
            return Err(BackendError::new(format!(
                "stack '{}' has an operation in progress",
                request.name
            )));
        }
        debug!(stack = %request.name, "simulated update submitted");
        let record = StackRecord::begin(
            request,
            Pending::Update,
            StackStatus::UpdateInProgress,
            self.settle_ticks,
        );
        inner.stacks.insert(request.name.clone(), record);
        Ok(OperationHandle::new())
    }

    fn delete_stack(&self, deployed_name: &str) -> Result<OperationHandle, BackendError> {
        let mut inner = self.write()?;
        let ticks = self.settle_ticks;
        let Some(record) = inner.stacks.get_mut(deployed_name) else {
            return Err(BackendError::new(format!(
                "stack '{deployed_name}' does not exist"
            )));
        };
        debug!(stack = deployed_name, "simulated delete submitted");
        record.status = StackStatus::DeleteInProgress;
        record.pending = Some(Pending::Delete);
        record.remaining_ticks = ticks;
        record.push_event(StackStatus::DeleteInProgress.as_str(), None);
        Ok(OperationHandle::new())
    }

    fn describe_stack(&self, deployed_name: &str) -> Result<Option<DescribedStack>, BackendError> {
        let mut inner = self.write()?;
        Self::tick(&mut inner, deployed_name);
        Ok(inner
            .stacks
            .get(deployed_name)
            .map(|record| record.describe(deployed_name)))
    }

    fn stack_events(
        &self,
        deployed_name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>, BackendError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| BackendError::new("backend state lock poisoned"))?;
        Ok(inner
            .stacks
            .get(deployed_name)
            .map(|record| {
                record
                    .events
                    .iter()
                    .filter(|e| since.is_none_or(|t| e.timestamp > t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
