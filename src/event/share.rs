//! `share` / `stopshare`: toggle screen sharing

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::error::EventError;
use crate::id::ClientId;
use crate::registry::Rooms;

/// `{"type":"share"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Share {}

impl Share {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        let handle = rooms.current_room(client).await?;
        let turn = rooms.turn_addrs_for(&handle).await?;

        let mut room = handle.lock().await;
        room.set_streaming(&client.id, true)?;

        let viewers: Vec<ClientId> = room
            .roster()
            .into_iter()
            .map(|u| u.id)
            .filter(|id| *id != client.id && !room.has_session(&client.id, id))
            .collect();
        for viewer in viewers {
            if let Err(e) = room.new_session(client.id, viewer, turn).await {
                tracing::debug!(room = %room.id(), error = %e, "Skipping session");
            }
        }

        room.notify_info_changed().await;
        rooms.finish(&handle, &mut room).await;
        Ok(())
    }
}

impl Event for Share {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

/// `{"type":"stopshare"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopShare {}

impl StopShare {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        let handle = rooms.current_room(client).await?;
        let mut room = handle.lock().await;

        room.set_streaming(&client.id, false)?;
        room.close_hosted_sessions(&client.id).await;
        room.notify_info_changed().await;
        rooms.finish(&handle, &mut room).await;
        Ok(())
    }
}

impl Event for StopShare {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::{self, RecordingSink};
    use crate::id::RoomId;
    use crate::protocol::message::Outgoing;
    use crate::registry::RoomSettings;

    async fn member(rooms: &Rooms, id: &RoomId) -> (ClientInfo, Arc<RecordingSink>) {
        let (mut client, sink) = testing::client();
        rooms.enter(&client, id, None, false).await.unwrap();
        client.room_id = Some(id.clone());
        (client, sink)
    }

    #[tokio::test]
    async fn test_share_opens_session_per_viewer() {
        let rooms = Rooms::new();
        let id = rooms.create(RoomSettings::default()).await.unwrap();
        let (host, host_sink) = member(&rooms, &id).await;
        let (_a, a_sink) = member(&rooms, &id).await;
        let (_b, b_sink) = member(&rooms, &id).await;

        Box::new(Share {}).execute(&rooms, &host).await.unwrap();

        let hosted = host_sink
            .frames()
            .iter()
            .filter(|f| matches!(f, Outgoing::HostSession { .. }))
            .count();
        assert_eq!(hosted, 2);
        for sink in [&a_sink, &b_sink] {
            assert!(sink
                .frames()
                .iter()
                .any(|f| matches!(f, Outgoing::ClientSession { peer, .. } if *peer == host.id)));
            assert!(sink.infos().last().unwrap()[0].streaming);
        }

        // Sharing again does not duplicate sessions
        Box::new(Share {}).execute(&rooms, &host).await.unwrap();
        let handle = rooms.lookup(&id).await.unwrap();
        assert_eq!(handle.lock().await.session_count(), 2);
    }

    #[tokio::test]
    async fn test_stopshare_ends_sessions() {
        let rooms = Rooms::new();
        let id = rooms.create(RoomSettings::default()).await.unwrap();
        let (host, _) = member(&rooms, &id).await;
        let (_viewer, viewer_sink) = member(&rooms, &id).await;

        Box::new(Share {}).execute(&rooms, &host).await.unwrap();
        viewer_sink.take();

        Box::new(StopShare {}).execute(&rooms, &host).await.unwrap();

        let frames = viewer_sink.frames();
        assert!(matches!(frames[0], Outgoing::EndSession { .. }));
        assert!(!viewer_sink.infos()[0][0].streaming);

        let handle = rooms.lookup(&id).await.unwrap();
        assert_eq!(handle.lock().await.session_count(), 0);
    }

    #[tokio::test]
    async fn test_share_outside_room() {
        let rooms = Rooms::new();
        let (client, _) = testing::client();

        let result = Box::new(Share {}).execute(&rooms, &client).await;
        assert!(matches!(result, Err(EventError::NotInRoom)));
    }
}
