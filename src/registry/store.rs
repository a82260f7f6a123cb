//! Room registry implementation
//!
//! The central registry that owns every room and knows which room each
//! client is in.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::client::ClientInfo;
use crate::error::EventError;
use crate::id::{ClientId, RoomId};
use crate::protocol::message::{CloseReason, ConnectionMode, RoomUser};
use crate::stats::HubMetrics;
use crate::turn::{TurnAddrs, TurnError};

use super::config::RegistryConfig;
use super::names;
use super::room::{Room, RoomHandle, RoomSettings};
use super::user::User;

/// Rooms plus the client → room index, guarded together
#[derive(Default)]
struct Directory {
    rooms: HashMap<RoomId, RoomHandle>,
    memberships: HashMap<ClientId, RoomId>,
}

/// Central registry for all rooms
///
/// The directory sits behind a `RwLock`; each room has its own `Mutex`.
/// A room lock may be held while taking the directory lock, never the other
/// way round (cleanup only ever `try_lock`s rooms).
pub struct Rooms {
    directory: RwLock<Directory>,
    config: RegistryConfig,
    metrics: Arc<HubMetrics>,
}

impl Rooms {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_metrics(config, Arc::new(HubMetrics::new()))
    }

    /// Create a new registry reporting into shared metrics
    pub fn with_metrics(config: RegistryConfig, metrics: Arc<HubMetrics>) -> Self {
        Self {
            directory: RwLock::new(Directory::default()),
            config,
            metrics,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Shared hub counters
    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    /// Create an empty room and return its ID
    ///
    /// An explicit ID must be free; otherwise a random ID is drawn until it
    /// does not collide with an existing room.
    pub async fn create(&self, settings: RoomSettings) -> Result<RoomId, EventError> {
        let mut directory = self.directory.write().await;

        let id = match settings.id.clone() {
            Some(id) => {
                if id.as_str().is_empty() || id.as_str().len() > self.config.max_room_id_len {
                    return Err(EventError::InvalidRoomId);
                }
                if directory.rooms.contains_key(&id) {
                    return Err(EventError::RoomAlreadyExists(id));
                }
                id
            }
            None => loop {
                let id = names::generate_room_id();
                if !directory.rooms.contains_key(&id) {
                    break id;
                }
            },
        };

        let room = Room::new(id.clone(), &settings, &self.config, Arc::clone(&self.metrics));
        directory
            .rooms
            .insert(id.clone(), Arc::new(Mutex::new(room)));
        self.metrics.room_created();

        tracing::info!(
            room = %id,
            mode = ?settings.mode,
            close_on_owner_leave = settings.close_on_owner_leave,
            "Room created"
        );

        Ok(id)
    }

    /// Look up a room
    pub async fn lookup(&self, id: &RoomId) -> Option<RoomHandle> {
        self.directory.read().await.rooms.get(id).cloned()
    }

    /// Room the client is currently in
    pub async fn room_of(&self, client: &ClientId) -> Option<RoomId> {
        self.directory.read().await.memberships.get(client).cloned()
    }

    /// Get total number of rooms
    pub async fn room_count(&self) -> usize {
        self.directory.read().await.rooms.len()
    }

    /// Current roster of a room, in join order
    pub async fn snapshot(&self, id: &RoomId) -> Option<Vec<RoomUser>> {
        let handle = self.lookup(id).await?;
        let room = handle.lock().await;
        Some(room.roster())
    }

    /// Readable anonymous display name
    pub fn rand_user_name(&self) -> String {
        names::random_user_name()
    }

    /// Display name for a joining client.
    ///
    /// Authenticated name, then the requested name, then a random one.
    pub fn resolve_name(&self, client: &ClientInfo, requested: Option<&str>) -> String {
        if let Some(user) = &client.authenticated_user {
            return user.clone();
        }
        match requested {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.rand_user_name(),
        }
    }

    /// Fetch TURN addresses, bounded by `turn_timeout`
    pub async fn turn_addrs(&self) -> Result<TurnAddrs, EventError> {
        match tokio::time::timeout(self.config.turn_timeout, self.config.turn_provider.get()).await {
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "TURN address lookup failed");
                Err(EventError::TurnProviderUnavailable(e))
            }
            Err(_) => {
                tracing::warn!("TURN address lookup timed out");
                Err(EventError::TurnProviderUnavailable(TurnError::Timeout))
            }
        }
    }

    /// TURN addresses for a room's mode; local rooms need none
    pub(crate) async fn turn_addrs_for(&self, handle: &RoomHandle) -> Result<TurnAddrs, EventError> {
        let mode = handle.lock().await.mode();
        if mode == ConnectionMode::Local {
            return Ok(TurnAddrs::default());
        }
        self.turn_addrs().await
    }

    /// Put a client into a room.
    ///
    /// Preconditions are checked in order: the client must not be in a room,
    /// the room must exist, TURN addresses must be available. Membership is
    /// only inserted once all of them hold. On success the roster is
    /// broadcast and every streaming member gets a session with the new
    /// client.
    pub async fn enter(
        &self,
        client: &ClientInfo,
        room_id: &RoomId,
        requested_name: Option<&str>,
        owner: bool,
    ) -> Result<(), EventError> {
        self.ensure_outside(client).await?;
        let handle = self.require(room_id).await?;
        let turn = self.turn_addrs_for(&handle).await?;
        self.enter_with_turn(client, room_id, requested_name, owner, turn)
            .await
    }

    /// [`Rooms::enter`] with TURN addresses the caller already fetched
    pub async fn enter_with_turn(
        &self,
        client: &ClientInfo,
        room_id: &RoomId,
        requested_name: Option<&str>,
        owner: bool,
        turn: TurnAddrs,
    ) -> Result<(), EventError> {
        self.ensure_outside(client).await?;
        let handle = self.require(room_id).await?;
        let name = self.resolve_name(client, requested_name);

        let mut room = handle.lock().await;
        room.join(User::new(client, name.clone(), owner))?;
        self.directory
            .write()
            .await
            .memberships
            .insert(client.id, room_id.clone());

        tracing::info!(room = %room_id, client = %client.id, name = %name, owner = owner, "User joined");

        room.notify_info_changed().await;
        self.metrics.user_joined();

        for streamer in room.streamers_except(&client.id) {
            if let Err(e) = room.new_session(streamer, client.id, turn).await {
                tracing::debug!(room = %room_id, error = %e, "Skipping session");
            }
        }

        self.finish(&handle, &mut room).await;
        Ok(())
    }

    async fn ensure_outside(&self, client: &ClientInfo) -> Result<(), EventError> {
        if client.room_id.is_some() || self.room_of(&client.id).await.is_some() {
            return Err(EventError::AlreadyInRoom);
        }
        Ok(())
    }

    async fn require(&self, room_id: &RoomId) -> Result<RoomHandle, EventError> {
        self.lookup(room_id)
            .await
            .ok_or_else(|| EventError::RoomNotFound(room_id.clone()))
    }

    /// Resolve the room of the calling client
    pub async fn current_room(&self, client: &ClientInfo) -> Result<RoomHandle, EventError> {
        let room_id = client.room_id.as_ref().ok_or(EventError::NotInRoom)?;
        self.require(room_id).await
    }

    /// Remove a client from its room
    pub async fn leave(&self, client: &ClientId) -> Result<(), EventError> {
        let room_id = self.room_of(client).await.ok_or(EventError::NotInRoom)?;

        let Some(handle) = self.lookup(&room_id).await else {
            self.forget(client, &room_id).await;
            return Ok(());
        };

        let mut room = handle.lock().await;
        if room.leave(client).await.is_some() {
            tracing::info!(room = %room_id, client = %client, "User left");
        }
        self.finish(&handle, &mut room).await;
        self.forget(client, &room_id).await;
        Ok(())
    }

    /// Transport-triggered cleanup for a closed connection
    pub async fn disconnect(&self, client: &ClientId) {
        if self.leave(client).await.is_ok() {
            tracing::debug!(client = %client, "Disconnected client left its room");
        }
    }

    /// Destroy a room: close its sessions, disconnect its users and drop it
    /// from the registry.
    ///
    /// Returns false if the room was already gone.
    pub async fn remove(&self, id: &RoomId) -> bool {
        let Some(handle) = self.lookup(id).await else {
            return false;
        };
        self.close_room(&handle, CloseReason::RoomClosed).await
    }

    /// Close every room, disconnecting all members
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = self.directory.read().await.rooms.values().cloned().collect();
        let count = handles.len();

        for handle in handles {
            self.close_room(&handle, CloseReason::Shutdown).await;
        }
        tracing::info!(rooms = count, "Closed all rooms");
    }

    async fn close_room(&self, handle: &RoomHandle, reason: CloseReason) -> bool {
        let mut room = handle.lock().await;
        room.close(reason).await;
        self.finish(handle, &mut room).await
    }

    /// Post-operation bookkeeping, run while still holding the room lock.
    ///
    /// Evicts broken users, drops memberships of departed users and removes
    /// the room from the directory once it is closed. Returns whether the
    /// room was removed by this call.
    pub(crate) async fn finish(&self, handle: &RoomHandle, room: &mut Room) -> bool {
        room.settle().await;

        let departed = room.take_departed();
        let closed = room.is_closed();
        if departed.is_empty() && !closed {
            return false;
        }

        let mut directory = self.directory.write().await;
        for id in departed {
            if directory.memberships.get(&id) == Some(room.id()) {
                directory.memberships.remove(&id);
            }
        }

        if !closed {
            return false;
        }

        let same_room = directory
            .rooms
            .get(room.id())
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if same_room {
            directory.rooms.remove(room.id());
            self.metrics.room_removed();
            tracing::info!(room = %room.id(), "Room removed");
        }
        same_room
    }

    async fn forget(&self, client: &ClientId, room_id: &RoomId) {
        let mut directory = self.directory.write().await;
        if directory.memberships.get(client) == Some(room_id) {
            directory.memberships.remove(client);
        }
    }

    /// Run cleanup once
    ///
    /// Removes rooms that were created but stayed empty longer than
    /// `empty_room_timeout`. Rooms that are busy are skipped.
    pub async fn cleanup(&self) {
        let mut directory = self.directory.write().await;
        let timeout = self.config.empty_room_timeout;

        let stale: Vec<RoomId> = directory
            .rooms
            .iter()
            .filter_map(|(id, handle)| {
                let mut room = handle.try_lock().ok()?;
                if room.is_empty() && room.age() > timeout {
                    room.mark_closed();
                    Some(id.clone())
                } else {
                    None
                }
            })
            .collect();

        for id in stale {
            directory.rooms.remove(&id);
            self.metrics.room_removed();
            tracing::info!(room = %id, "Room removed by cleanup");
        }
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let rooms = Arc::clone(self);
        let interval = rooms.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                rooms.cleanup().await;
            }
        })
    }
}

impl Default for Rooms {
    fn default() -> Self {
        Self::new()
    }
}
