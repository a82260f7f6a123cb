//! Error types
//!
//! `EventError` is what a single inbound event can fail with. It is always
//! local to the client that sent the event. `Error` covers the server layer
//! (sockets, WebSocket framing).

use thiserror::Error;

use crate::id::{ClientId, RoomId};
use crate::turn::TurnError;

/// Result alias for server-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Server-level error
#[derive(Error, Debug)]
pub enum Error {
    /// Socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event failed
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Failure of a single inbound event
#[derive(Error, Debug)]
pub enum EventError {
    /// Client tried to enter a room while already in one
    #[error("cannot join room, you are already in one")]
    AlreadyInRoom,

    /// Target room does not exist (or was just closed)
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    /// Event requires room membership
    #[error("not in a room")]
    NotInRoom,

    /// Referenced user is no longer part of the room
    #[error("user {0} is not in the room")]
    StaleUser(ClientId),

    /// No decoder registered for the event tag
    #[error("unknown event type: {0}")]
    UnknownEventKind(String),

    /// Frame is not a valid event envelope or payload
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// TURN address lookup failed or timed out
    #[error("TURN provider unavailable: {0}")]
    TurnProviderUnavailable(#[from] TurnError),

    /// Explicit room ID is already taken
    #[error("room with id {0} already exists")]
    RoomAlreadyExists(RoomId),

    /// Explicit room ID is empty or too long
    #[error("invalid room id")]
    InvalidRoomId,

    /// Action requires an authenticated user
    #[error("you need to login")]
    Unauthorized,
}

impl EventError {
    /// Stable machine-readable code for the error frame
    pub fn kind(&self) -> &'static str {
        match self {
            EventError::AlreadyInRoom => "already_in_room",
            EventError::RoomNotFound(_) => "room_not_found",
            EventError::NotInRoom => "not_in_room",
            EventError::StaleUser(_) => "stale_user",
            EventError::UnknownEventKind(_) => "unknown_event_kind",
            EventError::MalformedEvent(_) => "malformed_event",
            EventError::TurnProviderUnavailable(_) => "turn_provider_unavailable",
            EventError::RoomAlreadyExists(_) => "room_already_exists",
            EventError::InvalidRoomId => "invalid_room_id",
            EventError::Unauthorized => "unauthorized",
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        EventError::MalformedEvent(e.to_string())
    }
}
