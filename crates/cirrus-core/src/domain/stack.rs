//! Stack model: names, parameter values, definitions, and the stack set.
//!
//! # Design
//!
//! These are pure value types. They hold NO ordering or resolution logic.
//! Execution ordering lives in `graph.rs`; reference resolution lives in
//! the application layer, because it needs materialized backend state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

// ── StackName ─────────────────────────────────────────────────────────────────

/// Unique identifier of a stack within one configuration document.
///
/// Used as the node key of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(String);

impl StackName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── RefKind ───────────────────────────────────────────────────────────────────

/// The three categories of values a materialized stack exposes for
/// cross-stack reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// A parameter the stack itself was created with (echoed back).
    Parameter,
    /// A declared output value.
    Output,
    /// A resource logical ID, resolved to its physical ID.
    Resource,
}

impl RefKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Output => "output",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parameter" | "param" => Ok(Self::Parameter),
            "output" => Ok(Self::Output),
            "resource" => Ok(Self::Resource),
            other => Err(DomainError::Config(format!(
                "reference type must be parameter, output or resource, not '{other}'"
            ))),
        }
    }
}

// ── ParameterValue ────────────────────────────────────────────────────────────

/// A single stack parameter: either already-literal text, a symbolic
/// pointer into another stack's materialized values, or a list of the two
/// (joined with commas at resolution time, the backend's delimited-list
/// convention).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    Literal(String),
    Reference {
        stack: StackName,
        kind: RefKind,
        key: String,
    },
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    /// All references contained in this value, including inside lists.
    ///
    /// Graph validation walks these to enforce that every referenced stack
    /// is also a declared dependency.
    pub fn references(&self) -> Vec<&StackName> {
        match self {
            Self::Literal(_) => Vec::new(),
            Self::Reference { stack, .. } => vec![stack],
            Self::List(items) => items.iter().flat_map(|v| v.references()).collect(),
        }
    }
}

// ── StackDefinition ───────────────────────────────────────────────────────────

/// One deployable unit: template, parameters, tags and declared
/// dependencies, as loaded from the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDefinition {
    pub name: StackName,
    /// Declared dependency order edges. Required in the config, may be empty.
    pub depends: Vec<StackName>,
    /// Normalised template payload, forwarded verbatim to the backend.
    /// Opaque to the core.
    pub template_body: String,
    pub params: BTreeMap<String, ParameterValue>,
    /// Effective tags: root tags overridden by the stack's own.
    pub tags: BTreeMap<String, String>,
    /// Notification topic identifiers forwarded to the backend with
    /// every create/update. Root-scope topics unless the stack sets its
    /// own, which replace them wholesale.
    pub notify: Vec<String>,
    pub disabled: bool,
}

impl StackDefinition {
    /// The physical name this stack is deployed under.
    ///
    /// Qualified with the set name so several sets can share one backend
    /// account without collisions. A stack named like the set keeps the
    /// bare name.
    pub fn deployed_name(&self, set_name: &str) -> String {
        if self.name.as_str() == set_name {
            self.name.to_string()
        } else {
            format!("{}-{}", set_name, self.name)
        }
    }
}

// ── StackSet ──────────────────────────────────────────────────────────────────

/// The whole configuration: a named set of stacks in declaration order.
///
/// Declaration order is preserved because it is the topological-sort
/// tie-break, which keeps run order reproducible across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSet {
    pub name: String,
    pub region: String,
    /// Presentation only: whether status output is colour-highlighted.
    pub highlight_output: bool,
    stacks: Vec<StackDefinition>,
}

impl StackSet {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            highlight_output: true,
            stacks: Vec::new(),
        }
    }

    /// Append a stack, rejecting duplicate names.
    pub fn push_stack(&mut self, stack: StackDefinition) -> Result<(), DomainError> {
        if self.stacks.iter().any(|s| s.name == stack.name) {
            return Err(DomainError::DuplicateStack {
                name: stack.name.to_string(),
            });
        }
        self.stacks.push(stack);
        Ok(())
    }

    /// All stacks in declaration order, disabled ones included.
    pub fn stacks(&self) -> &[StackDefinition] {
        &self.stacks
    }

    /// Enabled stacks in declaration order. This is the node set of the
    /// dependency graph; disabled stacks never enter the state machine.
    pub fn enabled(&self) -> impl Iterator<Item = &StackDefinition> {
        self.stacks.iter().filter(|s| !s.disabled)
    }

    pub fn get(&self, name: &StackName) -> Option<&StackDefinition> {
        self.stacks.iter().find(|s| &s.name == name)
    }

    pub fn is_disabled(&self, name: &StackName) -> bool {
        self.get(name).is_some_and(|s| s.disabled)
    }
}

/// Merge root-scope and stack-scope tags; the stack wins on key conflict.
pub fn merge_tags(
    root: &BTreeMap<String, String>,
    stack: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = root.clone();
    for (k, v) in stack {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

// ── MaterializedStack ─────────────────────────────────────────────────────────

/// Concrete values a stack exposes once the backend confirms its
/// operation completed. Accumulated by the orchestrator for one
/// invocation; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedStack {
    pub outputs: BTreeMap<String, String>,
    /// Logical resource ID → physical resource ID.
    pub resources: BTreeMap<String, String>,
    /// Parameters echoed back by the backend.
    pub parameters: BTreeMap<String, String>,
}

impl MaterializedStack {
    /// Look up a value by reference kind and key.
    pub fn value(&self, kind: RefKind, key: &str) -> Option<&str> {
        let map = match kind {
            RefKind::Parameter => &self.parameters,
            RefKind::Output => &self.outputs,
            RefKind::Resource => &self.resources,
        };
        map.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ref_kind_from_str_accepts_aliases() {
        assert_eq!("output".parse::<RefKind>().unwrap(), RefKind::Output);
        assert_eq!("param".parse::<RefKind>().unwrap(), RefKind::Parameter);
        assert_eq!("RESOURCE".parse::<RefKind>().unwrap(), RefKind::Resource);
        assert!("export".parse::<RefKind>().is_err());
    }

    #[test]
    fn merge_tags_stack_wins_on_conflict() {
        let root = tags(&[("a", "1"), ("b", "2")]);
        let stack = tags(&[("b", "3"), ("c", "4")]);
        assert_eq!(merge_tags(&root, &stack), tags(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[test]
    fn deployed_name_is_qualified_with_set_name() {
        let stack = StackDefinition {
            name: "vpc".into(),
            depends: vec![],
            template_body: String::new(),
            params: BTreeMap::new(),
            tags: BTreeMap::new(),
            notify: Vec::new(),
            disabled: false,
        };
        assert_eq!(stack.deployed_name("prod"), "prod-vpc");
        assert_eq!(stack.deployed_name("vpc"), "vpc");
    }

    #[test]
    fn duplicate_stack_rejected() {
        let mut set = StackSet::new("prod", "eu-west-1");
        let stack = StackDefinition {
            name: "vpc".into(),
            depends: vec![],
            template_body: String::new(),
            params: BTreeMap::new(),
            tags: BTreeMap::new(),
            notify: Vec::new(),
            disabled: false,
        };
        set.push_stack(stack.clone()).unwrap();
        assert!(matches!(
            set.push_stack(stack),
            Err(DomainError::DuplicateStack { .. })
        ));
    }

    #[test]
    fn references_collected_from_lists() {
        let value = ParameterValue::List(vec![
            ParameterValue::Literal("a".into()),
            ParameterValue::Reference {
                stack: "vpc".into(),
                kind: RefKind::Output,
                key: "SubnetA".into(),
            },
            ParameterValue::Reference {
                stack: "db".into(),
                kind: RefKind::Resource,
                key: "Cluster".into(),
            },
        ]);
        let refs: Vec<_> = value.references().iter().map(|s| s.as_str().to_owned()).collect();
        assert_eq!(refs, vec!["vpc", "db"]);
    }

    #[test]
    fn materialized_lookup_by_kind() {
        let mut m = MaterializedStack::default();
        m.outputs.insert("VpcId".into(), "vpc-123".into());
        m.resources.insert("Gateway".into(), "igw-9".into());
        m.parameters.insert("CidrBlock".into(), "10.0.0.0/16".into());

        assert_eq!(m.value(RefKind::Output, "VpcId"), Some("vpc-123"));
        assert_eq!(m.value(RefKind::Resource, "Gateway"), Some("igw-9"));
        assert_eq!(m.value(RefKind::Parameter, "CidrBlock"), Some("10.0.0.0/16"));
        assert_eq!(m.value(RefKind::Output, "Missing"), None);
    }
}
