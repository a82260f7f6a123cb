//! `name`: change the caller's display name

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::error::EventError;
use crate::registry::Rooms;

/// `{"type":"name","username":..}`
#[derive(Debug, Clone, Deserialize)]
pub struct Name {
    pub username: String,
}

impl Name {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        let handle = rooms.current_room(client).await?;
        let mut room = handle.lock().await;

        // Authenticated users keep their canonical name
        let name = client.authenticated_user.clone().unwrap_or(self.username);
        room.rename(&client.id, name)?;
        room.notify_info_changed().await;
        rooms.finish(&handle, &mut room).await;
        Ok(())
    }
}

impl Event for Name {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}
