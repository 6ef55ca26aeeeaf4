//! Application layer errors.
//!
//! These errors represent failures during a run against the backend, not
//! configuration problems. Configuration problems are `DomainError` from
//! `crate::domain` and are always detected before any remote call.

use thiserror::Error;

use crate::domain::RefKind;
use crate::error::ErrorCategory;

/// Errors that occur while driving stack operations.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// A referenced key does not exist in the dependency's materialized
    /// record. A user configuration error; the run aborts, no guessing.
    #[error("Stack '{stack}' references {kind} '{key}' of '{dependency}', which has no such value")]
    UnresolvedReference {
        stack: String,
        dependency: String,
        kind: RefKind,
        key: String,
    },

    /// The referenced stack was never materialized. With a correct
    /// execution order this cannot happen; treated as an internal
    /// invariant violation, fatal, not retried.
    #[error("Internal: stack '{stack}' resolved before its dependency '{dependency}' materialized")]
    DependencyNotMaterialized { stack: String, dependency: String },

    /// The backend rejected or failed an operation. Never retried at
    /// this layer; the stack moves to Failed and dependents to Skipped.
    #[error("Backend error for stack '{stack}': {reason}")]
    Backend { stack: String, reason: String },

    /// The named stack is not part of the configuration (watch target).
    #[error("Stack '{name}' not found in configuration")]
    StackNotFound { name: String },

    /// The named stack does not exist in the backend.
    #[error("Stack '{name}' does not exist in the backend")]
    StackNotProvisioned { name: String },

    /// The blocking wait was interrupted. Remote state is left as the
    /// backend reports it; no compensating rollback is attempted.
    #[error("Operation cancelled while waiting on stack '{stack}'")]
    Cancelled { stack: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnresolvedReference {
                dependency, kind, key, ..
            } => vec![
                format!("'{dependency}' exposes no {kind} named '{key}'"),
                "Run 'cirrus check' to inspect what each stack exposes".into(),
            ],
            Self::DependencyNotMaterialized { .. } => vec![
                "This is a bug in the execution ordering, please report it".into(),
            ],
            Self::Backend { .. } => vec![
                "The backend reported the failure above; nothing was retried".into(),
                "Fix the cause and re-run; completed stacks are left untouched".into(),
            ],
            Self::StackNotFound { name } => vec![
                format!("No stack named '{name}' in the configuration"),
                "Check the --stack argument against the 'stacks' section".into(),
            ],
            Self::StackNotProvisioned { name } => vec![
                format!("Stack '{name}' has not been created yet"),
                "Run 'cirrus create' first".into(),
            ],
            Self::Cancelled { .. } => vec![
                "The backend may still finish the operation on its own".into(),
                "Re-run 'cirrus check' to see where things stand".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnresolvedReference { .. } => ErrorCategory::Configuration,
            Self::DependencyNotMaterialized { .. } => ErrorCategory::Internal,
            Self::Backend { .. } => ErrorCategory::Backend,
            Self::StackNotFound { .. } | Self::StackNotProvisioned { .. } => ErrorCategory::NotFound,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }
}
