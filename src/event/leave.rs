//! `leave`: exit the current room, keeping the connection open

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::registry::Rooms;

/// `{"type":"leave"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Leave {}

impl Event for Leave {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(rooms.leave(&client.id))
    }
}
