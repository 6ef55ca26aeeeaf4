//! Provisioner backend adapters.

pub mod memory;

pub use memory::InMemoryProvisioner;
