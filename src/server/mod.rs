//! WebSocket transport
//!
//! - [`SignalServer`]: accept loop, connection limit, graceful shutdown
//! - [`SignalHandler`]: authentication and disconnect hooks
//! - [`ServerConfig`]: listener settings

pub mod config;
pub mod connection;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::{AuthResult, DefaultHandler, SignalHandler};
pub use listener::SignalServer;
