//! Application services.

pub mod deploy_service;

pub use deploy_service::{Action, DeployService, RunReport, StackOutcome};
