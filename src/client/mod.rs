//! Connected participants
//!
//! The transport owns the connection. The core only sees a [`ClientInfo`]
//! and pushes frames through its [`ClientSink`]:
//!
//! - `write` queues one outbound frame
//! - `close` asks the transport to terminate the connection, without
//!   waiting behind queued frames

pub mod channel;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::id::{ClientId, RoomId};
use crate::protocol::message::{CloseReason, Outgoing};

pub use channel::{ChannelSink, CloseSignal, SinkReceiver};

/// Boxed future returned by sink operations
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Errors from a client sink
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// Connection is gone
    #[error("connection closed")]
    Closed,
}

/// Outbound capability of one connection
pub trait ClientSink: Send + Sync + 'static {
    /// Queue a frame for delivery
    fn write(&self, message: Outgoing) -> SinkFuture<'_>;

    /// Terminate the connection
    fn close(&self, reason: CloseReason) -> SinkFuture<'_>;
}

/// Description of one connected client
#[derive(Clone)]
pub struct ClientInfo {
    /// Connection ID
    pub id: ClientId,

    /// Room the client currently occupies
    pub room_id: Option<RoomId>,

    /// Resolved user name when the transport authenticated the client
    pub authenticated_user: Option<String>,

    /// Remote peer address
    pub addr: SocketAddr,

    /// Outbound capability
    pub sink: Arc<dyn ClientSink>,
}

impl ClientInfo {
    /// Create an anonymous client outside any room
    pub fn new(addr: SocketAddr, sink: Arc<dyn ClientSink>) -> Self {
        Self {
            id: ClientId::new(),
            room_id: None,
            authenticated_user: None,
            addr,
            sink,
        }
    }

    /// Mark the client as authenticated as `user`
    pub fn authenticated(mut self, user: impl Into<String>) -> Self {
        self.authenticated_user = Some(user.into());
        self
    }

    /// Check if the transport authenticated this client
    pub fn is_authenticated(&self) -> bool {
        self.authenticated_user.is_some()
    }
}

impl std::fmt::Debug for ClientInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInfo")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("authenticated_user", &self.authenticated_user)
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}
