//! Application layer: use cases, ports, and reference resolution.
//!
//! The services here orchestrate domain objects against the driven
//! ports; they own no backend knowledge beyond the port contracts.

pub mod error;
pub mod ports;
pub mod resolver;
pub mod services;

pub use error::ApplicationError;
pub use resolver::{Materialized, resolve_parameters};
pub use services::{Action, DeployService, RunReport, StackOutcome};
