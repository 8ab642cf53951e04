// Sluice Core - Queue Delegation Logic & Ports
// NO platform dependencies: the kernel delegation mechanism is a port

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
