//! Domain layer: pure stack-set model and ordering logic.
//!
//! Nothing in this module performs I/O or talks to the provisioning
//! backend; it can be tested entirely in memory.

pub mod error;
pub mod graph;
pub mod stack;
pub mod substitute;

pub use error::DomainError;
pub use graph::{DependencyGraph, ExecutionOrder};
pub use stack::{
    MaterializedStack, ParameterValue, RefKind, StackDefinition, StackName, StackSet, merge_tags,
};
pub use substitute::{substitute, substitute_env};
