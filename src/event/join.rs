//! `join`: enter an existing room

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::id::RoomId;
use crate::registry::Rooms;

/// `{"type":"join","id":..,"username":?}`
#[derive(Debug, Clone, Deserialize)]
pub struct Join {
    pub id: RoomId,
    #[serde(default)]
    pub username: Option<String>,
}

impl Event for Join {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(async move {
            rooms
                .enter(client, &self.id, self.username.as_deref(), false)
                .await
        })
    }
}
