//! Reference resolver: symbolic parameter values → concrete strings.
//!
//! Resolution is intentionally just-in-time, immediately before each
//! stack's own backend operation, because a dependency's outputs are not
//! known until its own operation completes. The accumulator of
//! materialized records is passed in explicitly so the resolver has no
//! hidden state and can be tested in isolation.

use std::collections::BTreeMap;

use crate::application::error::ApplicationError;
use crate::domain::{MaterializedStack, ParameterValue, StackDefinition, StackName};

/// Materialized records for every stack processed so far this invocation,
/// keyed by logical stack name. Mutated only by the orchestrator's
/// sequential loop.
pub type Materialized = BTreeMap<StackName, MaterializedStack>;

/// Produce a fully-literal parameter list for one stack, in
/// deterministic (name-sorted) order, ready for the backend.
pub fn resolve_parameters(
    stack: &StackDefinition,
    materialized: &Materialized,
) -> Result<Vec<(String, String)>, ApplicationError> {
    stack
        .params
        .iter()
        .map(|(name, value)| Ok((name.clone(), resolve_value(stack, value, materialized)?)))
        .collect()
}

fn resolve_value(
    stack: &StackDefinition,
    value: &ParameterValue,
    materialized: &Materialized,
) -> Result<String, ApplicationError> {
    match value {
        ParameterValue::Literal(text) => Ok(text.clone()),
        ParameterValue::Reference {
            stack: dependency,
            kind,
            key,
        } => {
            let record = materialized.get(dependency).ok_or_else(|| {
                ApplicationError::DependencyNotMaterialized {
                    stack: stack.name.to_string(),
                    dependency: dependency.to_string(),
                }
            })?;
            record
                .value(*kind, key)
                .map(str::to_owned)
                .ok_or_else(|| ApplicationError::UnresolvedReference {
                    stack: stack.name.to_string(),
                    dependency: dependency.to_string(),
                    kind: *kind,
                    key: key.clone(),
                })
        }
        // Backend convention: list parameters travel comma-delimited.
        ParameterValue::List(items) => {
            let parts = items
                .iter()
                .map(|item| resolve_value(stack, item, materialized))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(","))
        }
    }
}
