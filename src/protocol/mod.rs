//! Wire protocol
//!
//! - [`message`]: outbound frames and shared wire types
//! - [`registry`]: inbound event decoding and dispatch

pub mod message;
pub mod registry;

pub use message::{CloseReason, ConnectionMode, IceServer, Outgoing, RoomUser};
pub use registry::{Decoder, EventRegistry};
