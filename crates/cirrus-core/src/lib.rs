//! Cirrus Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Cirrus
//! multi-stack orchestrator, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           cirrus-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │            (DeployService)              │
//! │    Walks stacks in dependency order     │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │        (Driven: Provisioner)            │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    cirrus-adapters (Infrastructure)     │
//! │    (YAML loader, InMemoryProvisioner)   │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │  (StackSet, DependencyGraph, Params)    │
//! │        No External Dependencies         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cirrus_core::prelude::*;
//! use cirrus_core::application::ports::Provisioner;
//!
//! fn deploy(stack_set: &StackSet, provisioner: Box<dyn Provisioner>) -> CirrusResult<()> {
//!     let service = DeployService::new(provisioner);
//!     let report = service.run(stack_set, Action::Create, None)?;
//!     for (stack, reason) in report.failed() {
//!         eprintln!("{stack}: {reason}");
//!     }
//!     Ok(())
//! }
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        Action, DeployService, RunReport, StackOutcome,
        ports::{DescribedStack, Provisioner, ProvisionRequest, StackEvent, StackStatus},
    };
    pub use crate::domain::{
        DependencyGraph, ExecutionOrder, MaterializedStack, ParameterValue, RefKind,
        StackDefinition, StackName, StackSet,
    };
    pub use crate::error::{CirrusError, CirrusResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
