//! Infrastructure adapters for Cirrus.
//!
//! This crate implements the ports defined in `cirrus-core::application::ports`.
//! It contains all external dependencies and I/O operations: the YAML
//! configuration loader, template normalization, and the provisioner
//! backends.

pub mod config_loader;
pub mod provisioner;
pub mod template;

// Re-export commonly used adapters
pub use config_loader::ConfigLoader;
pub use provisioner::InMemoryProvisioner;
