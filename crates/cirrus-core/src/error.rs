//! Unified error handling for Cirrus Core.
//!
//! This module provides a unified error type that wraps domain and
//! application errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for Cirrus Core operations.
///
/// This enum wraps all possible errors that can occur when using
/// cirrus-core, providing a unified interface for error handling.
#[derive(Debug, Error, Clone)]
pub enum CirrusError {
    /// Errors from the domain layer (configuration and graph violations).
    #[error("Configuration error: {0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (run failures).
    #[error("Run error: {0}")]
    Application(#[from] ApplicationError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl CirrusError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug in Cirrus".into(),
                "Please report it with the configuration that triggered it".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            // Every domain error is caught before any remote call.
            Self::Domain(_) => ErrorCategory::Configuration,
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    NotFound,
    Backend,
    Cancelled,
    Internal,
}

/// Convenient result type alias.
pub type CirrusResult<T> = Result<T, CirrusError>;
