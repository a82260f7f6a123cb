//! Session signaling: relayed offers, answers and ICE candidates, plus
//! `connected` and `endsession`.
//!
//! None of these produce an error frame when the session is gone. Peers
//! race teardown all the time and a late candidate is not a client bug.

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::error::EventError;
use crate::id::SessionId;
use crate::registry::{RoomHandle, Rooms};
use crate::session::RelayKind;

#[derive(Deserialize)]
struct RelayPayload {
    sid: SessionId,
    #[serde(default)]
    value: serde_json::Value,
}

/// `{"type":"hostoffer"|"clientanswer"|"hostice"|"clientice","sid":..,"value":..}`
#[derive(Debug, Clone)]
pub struct Relay {
    pub kind: RelayKind,
    pub sid: SessionId,
    pub value: serde_json::Value,
}

impl Relay {
    /// Decode the payload of a relay frame of the given kind
    pub fn decode(kind: RelayKind, value: serde_json::Value) -> Result<Self, EventError> {
        let payload: RelayPayload = serde_json::from_value(value)?;
        Ok(Self {
            kind,
            sid: payload.sid,
            value: payload.value,
        })
    }

    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        let Some(handle) = session_room(rooms, client, self.kind.as_str()).await else {
            return Ok(());
        };
        let mut room = handle.lock().await;

        room.relay(&self.sid, &client.id, self.kind, self.value).await;
        rooms.finish(&handle, &mut room).await;
        Ok(())
    }
}

impl Event for Relay {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

/// `{"type":"connected","sid":..}`
#[derive(Debug, Clone, Deserialize)]
pub struct Connected {
    pub sid: SessionId,
}

impl Connected {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        if let Some(handle) = session_room(rooms, client, "connected").await {
            handle.lock().await.mark_connected(&self.sid, &client.id);
        }
        Ok(())
    }
}

impl Event for Connected {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

/// `{"type":"endsession","sid":..}`
#[derive(Debug, Clone, Deserialize)]
pub struct EndSession {
    pub sid: SessionId,
}

impl EndSession {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        let Some(handle) = session_room(rooms, client, "endsession").await else {
            return Ok(());
        };
        let mut room = handle.lock().await;

        room.end_session(&self.sid, &client.id).await;
        rooms.finish(&handle, &mut room).await;
        Ok(())
    }
}

impl Event for EndSession {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

async fn session_room(rooms: &Rooms, client: &ClientInfo, kind: &str) -> Option<RoomHandle> {
    match rooms.current_room(client).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::debug!(client = %client.id, kind = kind, error = %e, "Dropping session message");
            None
        }
    }
}
