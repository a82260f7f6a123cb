//! Room member

use std::net::SocketAddr;
use std::sync::Arc;

use crate::client::{ClientInfo, ClientSink};
use crate::id::ClientId;

/// A client that joined a room
pub struct User {
    /// Connection ID
    pub id: ClientId,

    /// Display name
    pub name: String,

    /// Currently sharing the screen
    pub streaming: bool,

    /// Room owner
    pub owner: bool,

    /// Remote peer address
    pub addr: SocketAddr,

    pub(crate) sink: Arc<dyn ClientSink>,

    /// Join order within the room, assigned by `Room::join`
    pub(crate) seq: u64,
}

impl User {
    /// Create a member from a connected client
    pub fn new(client: &ClientInfo, name: impl Into<String>, owner: bool) -> Self {
        Self {
            id: client.id,
            name: name.into(),
            streaming: false,
            owner,
            addr: client.addr,
            sink: Arc::clone(&client.sink),
            seq: 0,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("streaming", &self.streaming)
            .field("owner", &self.owner)
            .field("addr", &self.addr)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}
