//! `create`: open a new room and join it as owner

use serde::Deserialize;

use super::{Event, EventFuture};
use crate::client::ClientInfo;
use crate::error::EventError;
use crate::id::RoomId;
use crate::protocol::message::ConnectionMode;
use crate::registry::{RoomSettings, Rooms};
use crate::turn::TurnAddrs;

/// `{"type":"create","id":?,"mode":?,"closeOnOwnerLeave":?,"username":?,"joinIfExist":?}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Create {
    #[serde(default)]
    pub id: Option<RoomId>,
    #[serde(default)]
    pub mode: ConnectionMode,
    #[serde(default)]
    pub close_on_owner_leave: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub join_if_exist: bool,
}

impl Create {
    async fn run(self, rooms: &Rooms, client: &ClientInfo) -> Result<(), EventError> {
        if client.room_id.is_some() {
            return Err(EventError::AlreadyInRoom);
        }
        if !rooms
            .config()
            .auth_mode
            .may_create(client.is_authenticated(), self.mode)
        {
            return Err(EventError::Unauthorized);
        }

        if let Some(id) = &self.id {
            if self.join_if_exist && rooms.lookup(id).await.is_some() {
                return rooms
                    .enter(client, id, self.username.as_deref(), false)
                    .await;
            }
        }

        // Nothing is visible until the creator's TURN addresses are known
        let turn = match self.mode {
            ConnectionMode::Local => TurnAddrs::default(),
            _ => rooms.turn_addrs().await?,
        };

        let settings = RoomSettings {
            id: self.id,
            mode: self.mode,
            close_on_owner_leave: self.close_on_owner_leave,
        };
        let room_id = rooms.create(settings).await?;

        if let Err(e) = rooms
            .enter_with_turn(client, &room_id, self.username.as_deref(), true, turn)
            .await
        {
            if rooms
                .snapshot(&room_id)
                .await
                .is_some_and(|users| users.is_empty())
            {
                rooms.remove(&room_id).await;
            }
            return Err(e);
        }
        Ok(())
    }
}

impl Event for Create {
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a> {
        Box::pin(self.run(rooms, client))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::client::testing;
    use crate::registry::{AuthMode, RegistryConfig};
    use crate::turn::{TurnError, TurnFuture, TurnIpProvider};

    struct FailingTurn;

    impl TurnIpProvider for FailingTurn {
        fn get(&self) -> TurnFuture<'_> {
            Box::pin(async { Err(TurnError::NoAddress) })
        }
    }

    /// Fails the first lookup, then answers
    #[derive(Default)]
    struct FlakyTurn {
        failed: AtomicBool,
    }

    impl TurnIpProvider for FlakyTurn {
        fn get(&self) -> TurnFuture<'_> {
            let first = !self.failed.swap(true, Ordering::SeqCst);
            Box::pin(async move {
                if first {
                    Err(TurnError::NoAddress)
                } else {
                    Ok(TurnAddrs::new(Some(Ipv4Addr::new(10, 0, 0, 1)), None))
                }
            })
        }
    }

    #[tokio::test]
    async fn test_create_joins_as_owner() {
        let rooms = Rooms::new();
        let (client, sink) = testing::client();

        let event = Box::new(Create {
            username: Some("Alice".into()),
            ..Default::default()
        });
        event.execute(&rooms, &client).await.unwrap();

        let room_id = rooms.room_of(&client.id).await.unwrap();
        let roster = rooms.snapshot(&room_id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert!(roster[0].owner);
        assert_eq!(roster[0].name, "Alice");
        assert_eq!(sink.infos().len(), 1);
    }

    #[tokio::test]
    async fn test_create_existing_without_join_flag() {
        let rooms = Rooms::new();
        let (first, _) = testing::client();
        let (second, _) = testing::client();
        let id = RoomId::new("standup");

        let create = |join_if_exist| {
            Box::new(Create {
                id: Some(id.clone()),
                join_if_exist,
                ..Default::default()
            })
        };

        create(false).execute(&rooms, &first).await.unwrap();

        let result = create(false).execute(&rooms, &second).await;
        assert!(matches!(result, Err(EventError::RoomAlreadyExists(_))));

        create(true).execute(&rooms, &second).await.unwrap();
        let roster = rooms.snapshot(&id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(!roster[1].owner);
    }

    #[tokio::test]
    async fn test_create_requires_login() {
        let config = RegistryConfig::default().auth_mode(AuthMode::All);
        let rooms = Rooms::with_config(config);
        let (anonymous, _) = testing::client();

        let result = Box::new(Create::default()).execute(&rooms, &anonymous).await;
        assert!(matches!(result, Err(EventError::Unauthorized)));
        assert_eq!(rooms.room_count().await, 0);

        let authenticated = anonymous.authenticated("alice");
        Box::new(Create::default())
            .execute(&rooms, &authenticated)
            .await
            .unwrap();
        assert_eq!(rooms.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_failure_discards_room() {
        let rooms = Rooms::with_config(RegistryConfig::default().turn_provider(FailingTurn));
        let (client, _) = testing::client();

        let result = Box::new(Create::default()).execute(&rooms, &client).await;
        assert!(matches!(result, Err(EventError::TurnProviderUnavailable(_))));
        assert_eq!(rooms.room_count().await, 0);
        assert_eq!(rooms.metrics().snapshot().rooms_created, 0);
    }

    #[tokio::test]
    async fn test_turn_failure_never_exposes_room() {
        let rooms = Rooms::with_config(RegistryConfig::default().turn_provider(FlakyTurn::default()));
        let (creator, _) = testing::client();
        let (joiner, _) = testing::client();
        let id = RoomId::new("r");
        let create = || {
            Box::new(Create {
                id: Some(id.clone()),
                ..Default::default()
            })
        };

        let result = create().execute(&rooms, &creator).await;
        assert!(matches!(result, Err(EventError::TurnProviderUnavailable(_))));
        assert!(rooms.lookup(&id).await.is_none());
        assert_eq!(rooms.metrics().snapshot().rooms_created, 0);

        // A joiner racing the creator finds no room to slip into
        let result = rooms.enter(&joiner, &id, None, false).await;
        assert!(matches!(result, Err(EventError::RoomNotFound(_))));

        create().execute(&rooms, &creator).await.unwrap();
        let roster = rooms.snapshot(&id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert!(roster[0].owner);
        assert_eq!(roster[0].id, creator.id);
    }

    #[tokio::test]
    async fn test_local_room_skips_turn() {
        let rooms = Rooms::with_config(RegistryConfig::default().turn_provider(FailingTurn));
        let (client, _) = testing::client();

        let event = Box::new(Create {
            mode: ConnectionMode::Local,
            ..Default::default()
        });
        event.execute(&rooms, &client).await.unwrap();
        assert_eq!(rooms.room_count().await, 1);
    }

    #[test]
    fn test_decode_camel_case() {
        let create: Create = serde_json::from_str(
            r#"{"type":"create","mode":"stun","closeOnOwnerLeave":true,"joinIfExist":true}"#,
        )
        .unwrap();

        assert_eq!(create.mode, ConnectionMode::Stun);
        assert!(create.close_on_owner_leave);
        assert!(create.join_if_exist);
        assert!(create.id.is_none());
    }
}
