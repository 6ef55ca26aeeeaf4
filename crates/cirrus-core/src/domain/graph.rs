//! Dependency graph over stack names and its deterministic execution order.
//!
//! Built once per invocation from the stack set, after disabled stacks are
//! pruned. Construction validates referential integrity (every `depends`
//! entry exists; every parameter reference is a declared dependency);
//! ordering validates acyclicity.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::DomainError;
use crate::domain::stack::{StackName, StackSet};

/// Directed graph of enabled stacks; an edge runs from a dependent stack
/// to each stack it depends on.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Node set in declaration order — the topological tie-break.
    nodes: Vec<StackName>,
    /// Dependent → its (enabled) dependencies.
    deps: BTreeMap<StackName, Vec<StackName>>,
}

impl DependencyGraph {
    /// Build the graph from a stack set.
    ///
    /// Disabled stacks are removed together with every edge to or from
    /// them. A dependent of a disabled stack keeps its other edges; a
    /// parameter reference into a disabled stack is a configuration
    /// error (silently dropping it would deploy wrong values).
    pub fn build(set: &StackSet) -> Result<Self, DomainError> {
        let mut nodes = Vec::new();
        let mut deps: BTreeMap<StackName, Vec<StackName>> = BTreeMap::new();

        for stack in set.enabled() {
            let mut edges = Vec::new();
            for dep in &stack.depends {
                if set.get(dep).is_none() {
                    return Err(DomainError::UnknownDependency {
                        stack: stack.name.to_string(),
                        dependency: dep.to_string(),
                    });
                }
                // Edge to a disabled stack is pruned, not an error: the
                // dependent is treated as depending on nothing from it.
                if !set.is_disabled(dep) {
                    edges.push(dep.clone());
                }
            }

            for value in stack.params.values() {
                for referenced in value.references() {
                    if !stack.depends.contains(referenced) {
                        return Err(DomainError::UndeclaredDependency {
                            stack: stack.name.to_string(),
                            dependency: referenced.to_string(),
                        });
                    }
                    if set.is_disabled(referenced) {
                        return Err(DomainError::DisabledDependency {
                            stack: stack.name.to_string(),
                            dependency: referenced.to_string(),
                        });
                    }
                }
            }

            nodes.push(stack.name.clone());
            deps.insert(stack.name.clone(), edges);
        }

        Ok(Self { nodes, deps })
    }

    /// The (enabled) dependencies of one stack.
    pub fn dependencies_of(&self, name: &StackName) -> &[StackName] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &StackName) -> bool {
        self.deps.contains_key(name)
    }

    /// Compute the deterministic execution order: a topological sort with
    /// declaration order as the tie-break between unconstrained stacks.
    ///
    /// Kahn's algorithm; each round emits the earliest-declared stack
    /// whose dependencies have all been emitted.
    pub fn execution_order(&self) -> Result<ExecutionOrder, DomainError> {
        let mut emitted: BTreeSet<&StackName> = BTreeSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let next = self.nodes.iter().find(|n| {
                !emitted.contains(n)
                    && self.deps[n].iter().all(|d| emitted.contains(d))
            });
            match next {
                Some(name) => {
                    emitted.insert(name);
                    order.push(name.clone());
                }
                // No progress possible: the remaining stacks form a cycle.
                None => {
                    return Err(DomainError::CyclicDependency {
                        cycle: self.find_cycle(&emitted),
                    });
                }
            }
        }

        Ok(ExecutionOrder(order))
    }

    /// Extract the member names of one cycle among the not-yet-emitted
    /// stacks, for the error message.
    fn find_cycle(&self, emitted: &BTreeSet<&StackName>) -> Vec<String> {
        let start = self
            .nodes
            .iter()
            .find(|n| !emitted.contains(n))
            .expect("cycle reported with no remaining nodes");

        // Follow unemitted dependencies until a node repeats.
        let mut path: Vec<&StackName> = vec![start];
        let mut current = start;
        loop {
            let next = self.deps[current]
                .iter()
                .find(|d| !emitted.contains(d))
                .expect("node in cycle has no unemitted dependency");
            if let Some(pos) = path.iter().position(|n| *n == next) {
                return path[pos..].iter().map(|n| n.to_string()).collect();
            }
            path.push(next);
            current = next;
        }
    }
}

/// An ordered sequence of stack names: dependencies before dependents.
/// Reversed for teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOrder(Vec<StackName>);

impl ExecutionOrder {
    pub fn as_slice(&self) -> &[StackName] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &StackName> {
        self.0.iter()
    }

    /// Teardown order: dependents strictly before their dependencies.
    pub fn reversed(&self) -> Vec<StackName> {
        let mut rev = self.0.clone();
        rev.reverse();
        rev
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, name: &StackName) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stack::{ParameterValue, RefKind, StackDefinition};
    use std::collections::BTreeMap;

    fn stack(name: &str, depends: &[&str]) -> StackDefinition {
        StackDefinition {
            name: name.into(),
            depends: depends.iter().map(|d| (*d).into()).collect(),
            template_body: String::new(),
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

    fn order_of(set: &StackSet) -> Vec<String> {
        DependencyGraph::build(set)
            .unwrap()
            .execution_order()
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect()
    }

    #[test]
    fn dependencies_precede_dependents() {
        let set = set_of(vec![
            stack("app", &["db", "vpc"]),
            stack("db", &["vpc"]),
            stack("vpc", &[]),
        ]);
        assert_eq!(order_of(&set), vec!["vpc", "db", "app"]);
    }

    #[test]
    fn unconstrained_stacks_keep_declaration_order() {
        let set = set_of(vec![
            stack("zeta", &[]),
            stack("alpha", &[]),
            stack("mid", &["zeta"]),
        ]);
        // No edge between zeta and alpha: declaration order wins.
        assert_eq!(order_of(&set), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn topological_property_holds_for_diamond() {
        let set = set_of(vec![
            stack("top", &["left", "right"]),
            stack("left", &["base"]),
            stack("right", &["base"]),
            stack("base", &[]),
        ]);
        let order = order_of(&set);
        let idx = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(idx("base") < idx("left"));
        assert!(idx("base") < idx("right"));
        assert!(idx("left") < idx("top"));
        assert!(idx("right") < idx("top"));
    }

    #[test]
    fn two_stack_cycle_is_rejected_with_members() {
        let set = set_of(vec![stack("a", &["b"]), stack("b", &["a"])]);
        let err = DependencyGraph::build(&set)
            .unwrap()
            .execution_order()
            .unwrap_err();
        match err {
            DomainError::CyclicDependency { cycle } => {
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let set = set_of(vec![stack("a", &["a"])]);
        let err = DependencyGraph::build(&set)
            .unwrap()
            .execution_order()
            .unwrap_err();
        assert!(matches!(err, DomainError::CyclicDependency { .. }));
    }

    #[test]
    fn depends_on_unknown_stack_rejected() {
        let set = set_of(vec![stack("app", &["ghost"])]);
        let err = DependencyGraph::build(&set).unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownDependency {
                stack: "app".into(),
                dependency: "ghost".into()
            }
        );
    }

    #[test]
    fn reference_outside_depends_rejected_even_if_stack_exists() {
        let mut app = stack("app", &[]);
        app.params.insert(
            "VpcId".into(),
            ParameterValue::Reference {
                stack: "vpc".into(),
                kind: RefKind::Output,
                key: "VpcId".into(),
            },
        );
        let set = set_of(vec![stack("vpc", &[]), app]);
        let err = DependencyGraph::build(&set).unwrap_err();
        assert_eq!(
            err,
            DomainError::UndeclaredDependency {
                stack: "app".into(),
                dependency: "vpc".into()
            }
        );
    }

    #[test]
    fn disabled_stack_is_pruned_with_its_edges() {
        let mut metrics = stack("metrics", &[]);
        metrics.disabled = true;
        let set = set_of(vec![metrics, stack("app", &["metrics"])]);
        // app depends on the disabled stack but references nothing from it:
        // the edge is dropped and app becomes unconstrained.
        assert_eq!(order_of(&set), vec!["app"]);
    }

    #[test]
    fn reference_into_disabled_stack_is_config_error() {
        let mut metrics = stack("metrics", &[]);
        metrics.disabled = true;
        let mut app = stack("app", &["metrics"]);
        app.params.insert(
            "Topic".into(),
            ParameterValue::Reference {
                stack: "metrics".into(),
                kind: RefKind::Output,
                key: "TopicArn".into(),
            },
        );
        let set = set_of(vec![metrics, app]);
        let err = DependencyGraph::build(&set).unwrap_err();
        assert_eq!(
            err,
            DomainError::DisabledDependency {
                stack: "app".into(),
                dependency: "metrics".into()
            }
        );
    }

    #[test]
    fn reversed_is_exact_reverse() {
        let set = set_of(vec![
            stack("app", &["db"]),
            stack("db", &["vpc"]),
            stack("vpc", &[]),
        ]);
        let order = DependencyGraph::build(&set)
            .unwrap()
            .execution_order()
            .unwrap();
        let forward: Vec<_> = order.iter().cloned().collect();
        let mut backward = order.reversed();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
