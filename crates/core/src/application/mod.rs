// Application Layer - Queue lifecycle and request delegation

pub mod binding;
pub mod constants;
pub mod delegator;
pub mod queue;
pub mod registry;

// Re-exports
pub use binding::DestinationBindings;
pub use delegator::{Delegator, DelegatorStats, QueueSnapshot};
pub use queue::Queue;
pub use registry::QueueRegistry;
