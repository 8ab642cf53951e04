//! JSON-RPC Management API
//!
//! Exposes the administrative and configuration-change surfaces of the
//! delegation core to operators and the configuration reloader.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
