//! screenhub: signaling hub for peer-to-peer screen sharing
//!
//! Browsers connect over WebSocket, gather in rooms and announce when they
//! share their screen. The hub pairs every sharing user with every other
//! member of the room and relays the WebRTC offer/answer and ICE candidates
//! between the two ends of each pair. Media never passes through the hub.
//!
//! # Example
//!
//! ```no_run
//! use screenhub::{DefaultHandler, ServerConfig, SignalServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = SignalServer::new(ServerConfig::default(), DefaultHandler);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`server`]: WebSocket transport, one reader and one writer task per client
//! - [`protocol`]: wire frames and the event dispatcher
//! - [`event`]: one type per inbound event kind
//! - [`registry`]: rooms, users and their sessions
//! - [`session`]: host/viewer pairing state
//! - [`turn`]: TURN relay address providers

pub mod client;
pub mod error;
pub mod event;
pub mod id;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod turn;

pub use tokio_tungstenite::tungstenite;

pub use client::{ChannelSink, ClientInfo, ClientSink};
pub use error::{Error, EventError, Result};
pub use event::Event;
pub use id::{ClientId, RoomId, SessionId};
pub use protocol::{EventRegistry, Outgoing};
pub use registry::{RegistryConfig, RoomSettings, Rooms};
pub use server::{AuthResult, DefaultHandler, ServerConfig, SignalHandler, SignalServer};
pub use stats::{HubMetrics, HubStats};
pub use turn::{DnsTurnIps, StaticTurnIps, TurnAddrs, TurnIpProvider};
