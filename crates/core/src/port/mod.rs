// Port Layer - Interfaces for external dependencies

pub mod delegation;

// Re-exports
pub use delegation::{CreateRuleError, DelegateError, DelegationCapability, DelegationRule};
