//! Event decoding and dispatch
//!
//! Inbound frames are JSON objects tagged with `type`. The registry maps
//! each tag to a decoder that turns the frame into a boxed [`Event`].
//!
//! ```text
//! text frame ──► parse ──► "type" ──► decoder ──► Event::execute(rooms, client)
//!                  │          │           │
//!                  ▼          ▼           ▼
//!           MalformedEvent  UnknownEventKind  MalformedEvent
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ClientInfo;
use crate::error::EventError;
use crate::event::{
    Connected, Create, EndSession, Event, Join, Leave, Name, Relay, Share, StopShare,
};
use crate::registry::Rooms;
use crate::session::RelayKind;

/// Turns a parsed frame into an event
pub type Decoder = Arc<dyn Fn(Value) -> Result<Box<dyn Event>, EventError> + Send + Sync>;

/// Open set of event kinds, keyed by their `type` tag
#[derive(Clone)]
pub struct EventRegistry {
    decoders: HashMap<String, Decoder>,
}

impl EventRegistry {
    /// Registry without any event kinds
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register an event kind decoded straight from the frame
    pub fn register<E>(&mut self, tag: impl Into<String>) -> &mut Self
    where
        E: Event + DeserializeOwned,
    {
        self.register_with(tag, |value| {
            let event: E = serde_json::from_value(value)?;
            Ok(Box::new(event) as Box<dyn Event>)
        })
    }

    /// Register an event kind with a custom decoder
    pub fn register_with<F>(&mut self, tag: impl Into<String>, decoder: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Box<dyn Event>, EventError> + Send + Sync + 'static,
    {
        self.decoders.insert(tag.into(), Arc::new(decoder));
        self
    }

    /// Check if a tag is registered
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Decode a text frame into an event
    pub fn decode(&self, frame: &str) -> Result<(String, Box<dyn Event>), EventError> {
        let value: Value = serde_json::from_str(frame)?;

        let tag = match &value {
            Value::Object(map) => match map.get("type") {
                Some(Value::String(tag)) => tag.clone(),
                Some(_) => {
                    return Err(EventError::MalformedEvent(
                        "field `type` must be a string".into(),
                    ))
                }
                None => return Err(EventError::MalformedEvent("missing field `type`".into())),
            },
            _ => {
                return Err(EventError::MalformedEvent(
                    "event must be a JSON object".into(),
                ))
            }
        };

        let decoder = self
            .decoders
            .get(&tag)
            .ok_or_else(|| EventError::UnknownEventKind(tag.clone()))?;
        let event = decoder(value)?;
        Ok((tag, event))
    }

    /// Decode and run one frame on behalf of `client`
    ///
    /// Refreshes `client.room_id` from the registry before the event runs.
    pub async fn dispatch(
        &self,
        rooms: &Rooms,
        client: &mut ClientInfo,
        frame: &str,
    ) -> Result<(), EventError> {
        let result = self.run(rooms, client, frame).await;
        rooms.metrics().event_dispatched(result.is_err());
        result
    }

    async fn run(
        &self,
        rooms: &Rooms,
        client: &mut ClientInfo,
        frame: &str,
    ) -> Result<(), EventError> {
        let (tag, event) = self.decode(frame)?;

        client.room_id = rooms.room_of(&client.id).await;
        tracing::debug!(client = %client.id, event = %tag, "Dispatching event");

        event.execute(rooms, client).await
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register::<Create>("create")
            .register::<Join>("join")
            .register::<Name>("name")
            .register::<Share>("share")
            .register::<StopShare>("stopshare")
            .register::<Connected>("connected")
            .register::<EndSession>("endsession")
            .register::<Leave>("leave");

        for kind in [
            RelayKind::HostOffer,
            RelayKind::ClientAnswer,
            RelayKind::HostIce,
            RelayKind::ClientIce,
        ] {
            registry.register_with(kind.as_str(), move |value| {
                Ok(Box::new(Relay::decode(kind, value)?) as Box<dyn Event>)
            });
        }
        registry
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("EventRegistry").field("tags", &tags).finish()
    }
}
