//! Deploy Service - the stack lifecycle orchestrator.
//!
//! Walks the dependency graph in the order the requested action demands,
//! resolving each stack's parameters just-in-time against the
//! materialized records accumulated so far, and drives the provisioning
//! backend one stack at a time.
//!
//! Stacks are processed strictly sequentially, never in parallel: a
//! stack's parameters may depend on the outputs of the stack immediately
//! before it, and the backend call is itself a long-running blocking
//! wait. For any ancestor A of B, A's operation reaches a terminal state
//! strictly before B's begins.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{DescribedStack, EventObserver, Provisioner, ProvisionRequest, StackStatus},
        resolver::{Materialized, resolve_parameters},
    },
    domain::{DependencyGraph, StackDefinition, StackName, StackSet},
    error::{CirrusError, CirrusResult},
};

// ── Actions ───────────────────────────────────────────────────────────────────

/// The graph-wide actions a run can perform. Watching a single stack is
/// a separate entry point ([`DeployService::watch`]) because it targets
/// one stack, not the whole graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
    /// Read-only: report existence and resolvable parameters.
    Check,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Check => "check",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Terminal result of one stack within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOutcome {
    /// The requested operation completed.
    Succeeded,
    /// Create: the stack already exists remotely and was left alone.
    AlreadyExists,
    /// Update: remote template and parameters already match.
    UpToDate,
    /// The stack does not exist remotely (delete target, or check).
    NotProvisioned,
    /// The backend or resolution failed; the message says why.
    Failed(String),
    /// A transitive dependency failed; the backend was never contacted.
    Skipped,
}

impl StackOutcome {
    /// Everything except `Failed` and `Skipped` counts as success for the
    /// overall run result.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_) | Self::Skipped)
    }
}

impl std::fmt::Display for StackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::UpToDate => f.write_str("up to date"),
            Self::NotProvisioned => f.write_str("not provisioned"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Per-stack outcomes of one invocation, in processing order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub action: Action,
    outcomes: Vec<(StackName, StackOutcome)>,
}

impl RunReport {
    fn new(action: Action) -> Self {
        Self {
            action,
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, name: &StackName, outcome: StackOutcome) {
        self.outcomes.push((name.clone(), outcome));
    }

    pub fn outcomes(&self) -> &[(StackName, StackOutcome)] {
        &self.outcomes
    }

    /// The run succeeds only if every processed stack succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&StackName, &str)> {
        self.outcomes.iter().filter_map(|(n, o)| match o {
            StackOutcome::Failed(reason) => Some((n, reason.as_str())),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StackName> {
        self.outcomes
            .iter()
            .filter_map(|(n, o)| matches!(o, StackOutcome::Skipped).then_some(n))
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Orchestrates stack operations against an injected provisioner.
pub struct DeployService {
    provisioner: Box<dyn Provisioner>,
    observer: Box<dyn EventObserver>,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
}

impl DeployService {
    /// Create a service with the given backend adapter.
    pub fn new(provisioner: Box<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            observer: Box::new(crate::application::ports::NoopObserver),
            poll_interval: Duration::from_secs(5),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the event observer (CLI wires its status printer here).
    pub fn with_observer(mut self, observer: Box<dyn EventObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Override the describe-poll interval (tests use zero).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Shared flag that aborts the current blocking wait when set.
    /// Remote state is left as the backend reports it; no rollback.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run a graph-wide action.
    ///
    /// Configuration and graph errors abort before any remote call.
    /// Backend failures are isolated to the failing stack: independent
    /// branches keep processing, transitive dependents end `Skipped`.
    /// `only` restricts processing to a single stack (its position in
    /// the order is still honoured).
    #[instrument(skip_all, fields(set = %set.name, action = %action))]
    pub fn run(
        &self,
        set: &StackSet,
        action: Action,
        only: Option<&StackName>,
    ) -> CirrusResult<RunReport> {
        let graph = DependencyGraph::build(set)?;
        let order = graph.execution_order()?;
        info!(
            stacks = order.len(),
            order = ?order.as_slice(),
            "Execution order resolved"
        );

        if let Some(name) = only {
            if set.get(name).is_none() {
                return Err(ApplicationError::StackNotFound {
                    name: name.to_string(),
                }
                .into());
            }
        }

        let sequence: Vec<StackName> = match action {
            // Teardown runs dependents strictly before their dependencies.
            Action::Delete => order.reversed(),
            _ => order.iter().cloned().collect(),
        };

        let mut report = RunReport::new(action);
        let mut materialized = Materialized::new();
        // Stacks that failed or were skipped; used for Skipped propagation.
        let mut blocked: BTreeSet<StackName> = BTreeSet::new();

        for name in &sequence {
            if let Some(target) = only {
                if name != target {
                    continue;
                }
            }
            let stack = set
                .get(name)
                .expect("execution order contains only known stacks");

            if self.is_blocked(&graph, name, action, &blocked) {
                warn!(stack = %name, "Skipping: a related stack already failed");
                blocked.insert(name.clone());
                report.record(name, StackOutcome::Skipped);
                continue;
            }

            debug!(stack = %name, "Pending -> InProgress");
            let outcome = match action {
                Action::Create => self.create_one(set, stack, &mut materialized),
                Action::Update => self.update_one(set, stack, &mut materialized),
                Action::Delete => self.delete_one(set, stack),
                Action::Check => self.check_one(set, stack, &mut materialized),
            }?;

            if !outcome.is_success() {
                blocked.insert(name.clone());
            }
            info!(stack = %name, outcome = %outcome, "Stack finished");
            report.record(name, outcome);
        }

        Ok(report)
    }

    /// Watch a single stack's event stream until its remote status moves
    /// away from the status it had when watching began.
    #[instrument(skip_all, fields(set = %set.name, stack = %name))]
    pub fn watch(&self, set: &StackSet, name: &StackName) -> CirrusResult<StackStatus> {
        let stack = set.get(name).ok_or_else(|| ApplicationError::StackNotFound {
            name: name.to_string(),
        })?;
        let deployed = stack.deployed_name(&set.name);

        let described = self
            .describe(&deployed, name)?
            .ok_or_else(|| ApplicationError::StackNotProvisioned {
                name: name.to_string(),
            })?;
        let initial = described.status;
        info!(stack = %name, status = %initial, "Watching");

        let mut last_seen: Option<DateTime<Utc>> = None;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ApplicationError::Cancelled {
                    stack: name.to_string(),
                }
                .into());
            }
            last_seen = self.emit_events(&deployed, last_seen, name)?;

            let current = match self.describe(&deployed, name)? {
                Some(d) => d.status,
                // Deleted out from under us: that is a state change.
                None => return Ok(StackStatus::DeleteComplete),
            };
            if current != initial {
                info!(stack = %name, status = %current, "Status changed");
                return Ok(current);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    // -------------------------------------------------------------------------
    // Per-stack operations
    // -------------------------------------------------------------------------

    fn create_one(
        &self,
        set: &StackSet,
        stack: &StackDefinition,
        materialized: &mut Materialized,
    ) -> CirrusResult<StackOutcome> {
        let deployed = stack.deployed_name(&set.name);

        if let Some(existing) = self.describe(&deployed, &stack.name)? {
            // Already provisioned: leave it alone, but capture its values
            // so dependents can still resolve references against it.
            materialized.insert(stack.name.clone(), existing.materialize());
            return Ok(StackOutcome::AlreadyExists);
        }

        let parameters = match resolve_parameters(stack, materialized) {
            Ok(p) => p,
            Err(e) => return self.resolution_failure(e),
        };

        let request = ProvisionRequest {
            name: deployed.clone(),
            region: set.region.clone(),
            template_body: stack.template_body.clone(),
            parameters,
            tags: stack.tags.clone(),
            notify: stack.notify.clone(),
        };
        info!(stack = %stack.name, deployed = %deployed, "Creating");
        if let Err(e) = self.provisioner.create_stack(&request) {
            return Ok(StackOutcome::Failed(e.reason));
        }

        match self.wait_terminal(&deployed, &stack.name, Action::Create)? {
            status if status.is_success() => {
                self.capture(&deployed, &stack.name, materialized)?;
                Ok(StackOutcome::Succeeded)
            }
            status => Ok(StackOutcome::Failed(format!(
                "create ended in status {status}"
            ))),
        }
    }

    fn update_one(
        &self,
        set: &StackSet,
        stack: &StackDefinition,
        materialized: &mut Materialized,
    ) -> CirrusResult<StackOutcome> {
        let deployed = stack.deployed_name(&set.name);

        let Some(existing) = self.describe(&deployed, &stack.name)? else {
            return Ok(StackOutcome::Failed(format!(
                "stack '{deployed}' does not exist; cannot update something that was never created"
            )));
        };

        let parameters = match resolve_parameters(stack, materialized) {
            Ok(p) => p,
            Err(e) => return self.resolution_failure(e),
        };

        if self.is_up_to_date(&existing, stack, &parameters) {
            materialized.insert(stack.name.clone(), existing.materialize());
            return Ok(StackOutcome::UpToDate);
        }

        let request = ProvisionRequest {
            name: deployed.clone(),
            region: set.region.clone(),
            template_body: stack.template_body.clone(),
            parameters,
            tags: stack.tags.clone(),
            notify: stack.notify.clone(),
        };
        info!(stack = %stack.name, deployed = %deployed, "Updating");
        if let Err(e) = self.provisioner.update_stack(&request) {
            return Ok(StackOutcome::Failed(e.reason));
        }

        match self.wait_terminal(&deployed, &stack.name, Action::Update)? {
            status if status.is_success() => {
                self.capture(&deployed, &stack.name, materialized)?;
                Ok(StackOutcome::Succeeded)
            }
            status => Ok(StackOutcome::Failed(format!(
                "update ended in status {status}"
            ))),
        }
    }

    fn delete_one(&self, set: &StackSet, stack: &StackDefinition) -> CirrusResult<StackOutcome> {
        let deployed = stack.deployed_name(&set.name);

        if self.describe(&deployed, &stack.name)?.is_none() {
            return Ok(StackOutcome::NotProvisioned);
        }

        info!(stack = %stack.name, deployed = %deployed, "Deleting");
        if let Err(e) = self.provisioner.delete_stack(&deployed) {
            return Ok(StackOutcome::Failed(e.reason));
        }

        match self.wait_terminal(&deployed, &stack.name, Action::Delete)? {
            StackStatus::DeleteComplete => Ok(StackOutcome::Succeeded),
            status => Ok(StackOutcome::Failed(format!(
                "delete ended in status {status}"
            ))),
        }
    }

    /// Read-only: report existence; resolve parameters where possible.
    /// An unresolvable reference is expected when a dependency has not
    /// been created yet and is reported, not fatal.
    fn check_one(
        &self,
        set: &StackSet,
        stack: &StackDefinition,
        materialized: &mut Materialized,
    ) -> CirrusResult<StackOutcome> {
        let deployed = stack.deployed_name(&set.name);

        let existing = self.describe(&deployed, &stack.name)?;
        if let Some(described) = &existing {
            materialized.insert(stack.name.clone(), described.materialize());
        }

        match resolve_parameters(stack, materialized) {
            Ok(parameters) => {
                info!(stack = %stack.name, ?parameters, "Would be provisioned with");
            }
            Err(e) => {
                info!(
                    stack = %stack.name,
                    "Cannot determine parameters yet ({e}); most likely a dependency has not been created"
                );
            }
        }

        Ok(if existing.is_some() {
            StackOutcome::AlreadyExists
        } else {
            StackOutcome::NotProvisioned
        })
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    /// Whether this stack must be skipped because of an earlier failure.
    ///
    /// Forward actions: blocked when any direct dependency is blocked.
    /// Delete: blocked when any blocked stack still depends on this one
    /// (nothing is torn down while a dependent may still need it).
    /// Transitive propagation falls out of blocked stacks being added to
    /// the set themselves.
    fn is_blocked(
        &self,
        graph: &DependencyGraph,
        name: &StackName,
        action: Action,
        blocked: &BTreeSet<StackName>,
    ) -> bool {
        match action {
            Action::Delete => blocked
                .iter()
                .any(|b| graph.dependencies_of(b).contains(name)),
            _ => graph.dependencies_of(name).iter().any(|d| blocked.contains(d)),
        }
    }

    /// Map a resolution error to a stack outcome or a fatal run error.
    fn resolution_failure(&self, err: ApplicationError) -> CirrusResult<StackOutcome> {
        match err {
            // Correct ordering makes this impossible; a bug, not a stack failure.
            ApplicationError::DependencyNotMaterialized { .. } => Err(err.into()),
            other => Ok(StackOutcome::Failed(other.to_string())),
        }
    }

    fn describe(
        &self,
        deployed: &str,
        name: &StackName,
    ) -> CirrusResult<Option<DescribedStack>> {
        self.provisioner
            .describe_stack(deployed)
            .map_err(|e| {
                CirrusError::from(ApplicationError::Backend {
                    stack: name.to_string(),
                    reason: e.reason,
                })
            })
    }

    /// Re-describe after a successful operation and record the result
    /// for downstream reference resolution.
    fn capture(
        &self,
        deployed: &str,
        name: &StackName,
        materialized: &mut Materialized,
    ) -> CirrusResult<()> {
        let described = self.describe(deployed, name)?.ok_or_else(|| {
            CirrusError::from(ApplicationError::Backend {
                stack: name.to_string(),
                reason: "stack disappeared after a successful operation".into(),
            })
        })?;
        materialized.insert(name.clone(), described.materialize());
        Ok(())
    }

    /// Remote parameters and template both match what we would send.
    fn is_up_to_date(
        &self,
        existing: &DescribedStack,
        stack: &StackDefinition,
        parameters: &[(String, String)],
    ) -> bool {
        if existing.template_body != stack.template_body {
            return false;
        }
        if existing.parameters.len() != parameters.len() {
            return false;
        }
        parameters
            .iter()
            .all(|(k, v)| existing.parameters.get(k) == Some(v))
    }

    /// Blocking, cancellable wait: poll describe until the backend
    /// reports a terminal status, forwarding new events to the observer.
    fn wait_terminal(
        &self,
        deployed: &str,
        name: &StackName,
        action: Action,
    ) -> CirrusResult<StackStatus> {
        let mut last_seen: Option<DateTime<Utc>> = None;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ApplicationError::Cancelled {
                    stack: name.to_string(),
                }
                .into());
            }

            last_seen = self.emit_events(deployed, last_seen, name)?;

            let status = match self.describe(deployed, name)? {
                Some(described) => described.status,
                None if action == Action::Delete => return Ok(StackStatus::DeleteComplete),
                None => {
                    return Err(ApplicationError::Backend {
                        stack: name.to_string(),
                        reason: "stack disappeared while waiting for it to settle".into(),
                    }
                    .into());
                }
            };
            if status.is_terminal() {
                return Ok(status);
            }
            debug!(stack = %name, %status, "Waiting");
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Forward events newer than `since` to the observer; returns the
    /// newest timestamp seen.
    fn emit_events(
        &self,
        deployed: &str,
        since: Option<DateTime<Utc>>,
        name: &StackName,
    ) -> CirrusResult<Option<DateTime<Utc>>> {
        let events = self
            .provisioner
            .stack_events(deployed, since)
            .map_err(|e| {
                CirrusError::from(ApplicationError::Backend {
                    stack: name.to_string(),
                    reason: e.reason,
                })
            })?;
        let mut newest = since;
        for event in &events {
            self.observer.on_event(event);
            if newest.is_none_or(|t| event.timestamp > t) {
                newest = Some(event.timestamp);
            }
        }
        Ok(newest)
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BackendError, MockProvisioner, OperationHandle};
    use crate::domain::{ParameterValue, RefKind};
    use std::collections::BTreeMap;

    fn stack(name: &str, depends: &[&str]) -> StackDefinition {
        StackDefinition {
            name: name.into(),
            depends: depends.iter().map(|d| (*d).into()).collect(),
            template_body: "{}".into(),
            params: BTreeMap::new(),
            tags: BTreeMap::new(),
            notify: Vec::new(),
            disabled: false,
        }
    }

    fn set_of(stacks: Vec<StackDefinition>) -> StackSet {
        let mut set = StackSet::new("test", "eu-west-1");
        for s in stacks {
            set.push_stack(s).unwrap();
        }
        set
    }

    fn service(mock: MockProvisioner) -> DeployService {
        DeployService::new(Box::new(mock)).with_poll_interval(Duration::ZERO)
    }

    fn described(name: &str, status: StackStatus) -> DescribedStack {
        DescribedStack {
            name: name.into(),
            status,
            template_body: "{}".into(),
            outputs: BTreeMap::new(),
            resources: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn cycle_never_reaches_the_backend() {
        let set = set_of(vec![stack("a", &["b"]), stack("b", &["a"])]);
        // Mock with no expectations: any backend call would panic.
        let svc = service(MockProvisioner::new());
        let err = svc.run(&set, Action::Create, None).unwrap_err();
        assert!(matches!(
            err,
            CirrusError::Domain(crate::domain::DomainError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn backend_failure_skips_transitive_dependents() {
        // vpc fails; db depends on vpc; app depends on db. Both dependents
        // must end Skipped without the backend ever seeing them.
        let set = set_of(vec![
            stack("vpc", &[]),
            stack("db", &["vpc"]),
            stack("app", &["db"]),
        ]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack()
            .withf(|name| name == "test-vpc")
            .returning(|_| Ok(None));
        mock.expect_create_stack()
            .withf(|req| req.name == "test-vpc")
            .returning(|_| Err(BackendError::new("limit exceeded")));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        assert!(!report.succeeded());
        let outcomes: Vec<_> = report
            .outcomes()
            .iter()
            .map(|(n, o)| (n.to_string(), o.clone()))
            .collect();
        assert_eq!(outcomes[0].0, "vpc");
        assert!(matches!(outcomes[0].1, StackOutcome::Failed(_)));
        assert_eq!(outcomes[1], ("db".into(), StackOutcome::Skipped));
        assert_eq!(outcomes[2], ("app".into(), StackOutcome::Skipped));
    }

    #[test]
    fn independent_branch_proceeds_after_failure() {
        let set = set_of(vec![
            stack("vpc", &[]),
            stack("cache", &[]),
            stack("app", &["vpc"]),
        ]);

        let mut mock = MockProvisioner::new();
        // vpc: create fails
        mock.expect_describe_stack()
            .withf(|n| n == "test-vpc")
            .returning(|_| Ok(None));
        mock.expect_create_stack()
            .withf(|r| r.name == "test-vpc")
            .returning(|_| Err(BackendError::new("boom")));
        // cache: independent of vpc, create succeeds immediately
        let mut first = true;
        mock.expect_describe_stack()
            .withf(|n| n == "test-cache")
            .returning(move |_| {
                if first {
                    first = false;
                    Ok(None)
                } else {
                    Ok(Some(described("test-cache", StackStatus::CreateComplete)))
                }
            });
        mock.expect_create_stack()
            .withf(|r| r.name == "test-cache")
            .returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        let by_name: BTreeMap<String, StackOutcome> = report
            .outcomes()
            .iter()
            .map(|(n, o)| (n.to_string(), o.clone()))
            .collect();
        assert!(matches!(by_name["vpc"], StackOutcome::Failed(_)));
        assert_eq!(by_name["cache"], StackOutcome::Succeeded);
        assert_eq!(by_name["app"], StackOutcome::Skipped);
    }

    #[test]
    fn create_waits_through_in_progress_states() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(match calls {
                1 => None, // pre-create existence probe
                2 | 3 => Some(described("test-vpc", StackStatus::CreateInProgress)),
                _ => Some(described("test-vpc", StackStatus::CreateComplete)),
            })
        });
        mock.expect_create_stack().returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcomes()[0].1, StackOutcome::Succeeded);
    }

    #[test]
    fn notification_topics_reach_the_backend() {
        let mut vpc = stack("vpc", &[]);
        vpc.notify = vec!["arn:aws:sns:eu-west-1:123:deploys".to_string()];
        let set = set_of(vec![vpc]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(match calls {
                1 => None,
                _ => Some(described("test-vpc", StackStatus::CreateComplete)),
            })
        });
        mock.expect_create_stack()
            .withf(|r| r.notify == ["arn:aws:sns:eu-west-1:123:deploys"])
            .returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        assert!(report.succeeded());
    }

    #[test]
    fn rollback_complete_is_a_failure() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(match calls {
                1 => None,
                _ => Some(described("test-vpc", StackStatus::RollbackComplete)),
            })
        });
        mock.expect_create_stack().returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        assert!(!report.succeeded());
    }

    #[test]
    fn existing_stack_is_left_alone_but_materialized() {
        // vpc exists already; app references its output and must resolve
        // against the described values without vpc being re-created.
        let mut app = stack("app", &["vpc"]);
        app.params.insert(
            "VpcId".into(),
            ParameterValue::Reference {
                stack: "vpc".into(),
                kind: RefKind::Output,
                key: "VpcId".into(),
            },
        );
        let set = set_of(vec![stack("vpc", &[]), app]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack()
            .withf(|n| n == "test-vpc")
            .returning(|_| {
                let mut d = described("test-vpc", StackStatus::CreateComplete);
                d.outputs.insert("VpcId".into(), "vpc-123".into());
                Ok(Some(d))
            });
        let mut first = true;
        mock.expect_describe_stack()
            .withf(|n| n == "test-app")
            .returning(move |_| {
                if first {
                    first = false;
                    Ok(None)
                } else {
                    Ok(Some(described("test-app", StackStatus::CreateComplete)))
                }
            });
        mock.expect_create_stack()
            .withf(|r| {
                r.name == "test-app"
                    && r.parameters == vec![("VpcId".to_string(), "vpc-123".to_string())]
            })
            .returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Create, None).unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcomes()[0].1, StackOutcome::AlreadyExists);
        assert_eq!(report.outcomes()[1].1, StackOutcome::Succeeded);
    }

    #[test]
    fn delete_runs_in_reverse_order() {
        let set = set_of(vec![stack("vpc", &[]), stack("app", &["vpc"])]);

        let mut mock = MockProvisioner::new();
        // Neither stack exists: both report NotProvisioned, but the probe
        // order must be app first, vpc second.
        let mut seen: Vec<String> = Vec::new();
        mock.expect_describe_stack().returning(move |name| {
            seen.push(name.to_string());
            assert!(
                seen != vec!["test-vpc".to_string(), "test-app".to_string()],
                "delete probed the dependency before its dependent"
            );
            Ok(None)
        });

        let report = service(mock).run(&set, Action::Delete, None).unwrap();
        let names: Vec<_> = report.outcomes().iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["app", "vpc"]);
    }

    #[test]
    fn delete_treats_vanished_stack_as_complete() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(match calls {
                1 => Some(described("test-vpc", StackStatus::CreateComplete)),
                // gone while waiting == deleted
                _ => None,
            })
        });
        mock.expect_delete_stack().returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let report = service(mock).run(&set, Action::Delete, None).unwrap();
        assert_eq!(report.outcomes()[0].1, StackOutcome::Succeeded);
    }

    #[test]
    fn update_of_missing_stack_fails() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack().returning(|_| Ok(None));

        let report = service(mock).run(&set, Action::Update, None).unwrap();
        assert!(matches!(report.outcomes()[0].1, StackOutcome::Failed(_)));
    }

    #[test]
    fn update_skips_when_nothing_changed() {
        let mut vpc = stack("vpc", &[]);
        vpc.params
            .insert("Cidr".into(), ParameterValue::Literal("10.0.0.0/16".into()));
        let set = set_of(vec![vpc]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack().returning(|_| {
            let mut d = described("test-vpc", StackStatus::CreateComplete);
            d.parameters.insert("Cidr".into(), "10.0.0.0/16".into());
            Ok(Some(d))
        });
        // No expect_update_stack: calling it would panic.

        let report = service(mock).run(&set, Action::Update, None).unwrap();
        assert_eq!(report.outcomes()[0].1, StackOutcome::UpToDate);
    }

    #[test]
    fn check_is_read_only_and_tolerates_unresolved_references() {
        let mut app = stack("app", &["vpc"]);
        app.params.insert(
            "VpcId".into(),
            ParameterValue::Reference {
                stack: "vpc".into(),
                kind: RefKind::Output,
                key: "VpcId".into(),
            },
        );
        let set = set_of(vec![stack("vpc", &[]), app]);

        let mut mock = MockProvisioner::new();
        // Nothing exists yet; check must not fail and must not mutate.
        mock.expect_describe_stack().returning(|_| Ok(None));

        let report = service(mock).run(&set, Action::Check, None).unwrap();
        assert!(report.succeeded());
        assert!(report
            .outcomes()
            .iter()
            .all(|(_, o)| *o == StackOutcome::NotProvisioned));
    }

    #[test]
    fn only_filter_processes_single_stack() {
        let set = set_of(vec![stack("vpc", &[]), stack("app", &["vpc"])]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack()
            .withf(|n| n == "test-app")
            .returning(|_| Ok(None));

        let report = service(mock)
            .run(&set, Action::Check, Some(&"app".into()))
            .unwrap();
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(report.outcomes()[0].0.to_string(), "app");
    }

    #[test]
    fn only_filter_unknown_stack_errors() {
        let set = set_of(vec![stack("vpc", &[])]);
        let svc = service(MockProvisioner::new());
        let err = svc
            .run(&set, Action::Check, Some(&"ghost".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            CirrusError::Application(ApplicationError::StackNotFound { .. })
        ));
    }

    #[test]
    fn cancel_flag_aborts_the_wait() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(match calls {
                1 => None,
                _ => Some(described("test-vpc", StackStatus::CreateInProgress)),
            })
        });
        mock.expect_create_stack().returning(|_| Ok(OperationHandle::new()));
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let svc = service(mock);
        // Set before running: the wait loop checks the flag each round.
        svc.cancel_flag().store(true, Ordering::Relaxed);
        let err = svc.run(&set, Action::Create, None).unwrap_err();
        assert!(matches!(
            err,
            CirrusError::Application(ApplicationError::Cancelled { .. })
        ));
    }

    #[test]
    fn watch_returns_on_status_change() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        let mut calls = 0u32;
        mock.expect_describe_stack().returning(move |_| {
            calls += 1;
            Ok(Some(described(
                "test-vpc",
                if calls <= 2 {
                    StackStatus::UpdateInProgress
                } else {
                    StackStatus::UpdateComplete
                },
            )))
        });
        mock.expect_stack_events().returning(|_, _| Ok(Vec::new()));

        let status = service(mock).watch(&set, &"vpc".into()).unwrap();
        assert_eq!(status, StackStatus::UpdateComplete);
    }

    #[test]
    fn watch_of_unprovisioned_stack_errors() {
        let set = set_of(vec![stack("vpc", &[])]);

        let mut mock = MockProvisioner::new();
        mock.expect_describe_stack().returning(|_| Ok(None));

        let err = service(mock).watch(&set, &"vpc".into()).unwrap_err();
        assert!(matches!(
            err,
            CirrusError::Application(ApplicationError::StackNotProvisioned { .. })
        ));
    }
}
