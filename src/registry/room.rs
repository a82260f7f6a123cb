//! A single room
//!
//! A room is always accessed through its `tokio::sync::Mutex`, so every
//! method here runs with exclusive access. Outbound writes happen while the
//! lock is held: recipients observe broadcasts in the same order as the
//! mutations that caused them, and relays between two peers keep their
//! send order.
//!
//! Writes are bounded by the configured write timeout. A failed or timed out
//! write marks the user broken; [`Room::settle`] evicts broken users once
//! the current operation is done.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::EventError;
use crate::id::{ClientId, RoomId, SessionId};
use crate::protocol::message::{ice_servers, CloseReason, ConnectionMode, Outgoing, RoomUser};
use crate::session::{RelayKind, Session};
use crate::stats::HubMetrics;
use crate::turn::TurnAddrs;

use super::config::RegistryConfig;
use super::user::User;

/// Settings chosen by the room creator
#[derive(Debug, Clone, Default)]
pub struct RoomSettings {
    /// Explicit room ID; a random one is generated when absent
    pub id: Option<RoomId>,

    /// How peers connect
    pub mode: ConnectionMode,

    /// Destroy the room when its last owner leaves
    pub close_on_owner_leave: bool,
}

/// Shared handle to a room
pub type RoomHandle = Arc<tokio::sync::Mutex<Room>>;

/// A room: users, their sessions and room metadata
pub struct Room {
    id: RoomId,
    mode: ConnectionMode,
    close_on_owner_leave: bool,

    users: HashMap<ClientId, User>,
    sessions: HashMap<SessionId, Session>,
    next_seq: u64,

    /// Set once, right before the room leaves the registry
    closed: bool,

    /// Users whose sink failed during the current operation
    broken: Vec<ClientId>,

    /// Users removed since the registry last synced memberships
    departed: Vec<ClientId>,

    created_at: Instant,
    write_timeout: Duration,
    turn_port: u16,
    metrics: Arc<HubMetrics>,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        settings: &RoomSettings,
        config: &RegistryConfig,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            id,
            mode: settings.mode,
            close_on_owner_leave: settings.close_on_owner_leave,
            users: HashMap::new(),
            sessions: HashMap::new(),
            next_seq: 0,
            closed: false,
            broken: Vec::new(),
            departed: Vec::new(),
            created_at: Instant::now(),
            write_timeout: config.write_timeout,
            turn_port: config.turn_port,
            metrics,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn user(&self, id: &ClientId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn session(&self, sid: &SessionId) -> Option<&Session> {
        self.sessions.get(sid)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions the given client takes part in
    pub fn sessions_of(&self, id: &ClientId) -> Vec<&Session> {
        self.sessions.values().filter(|s| s.involves(id)).collect()
    }

    /// Time since the room was created
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Current roster in join order, `you` unset
    pub fn roster(&self) -> Vec<RoomUser> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.seq);
        users
            .into_iter()
            .map(|u| RoomUser {
                id: u.id,
                name: u.name.clone(),
                streaming: u.streaming,
                owner: u.owner,
                you: false,
            })
            .collect()
    }

    /// Streaming users other than `except`
    pub fn streamers_except(&self, except: &ClientId) -> Vec<ClientId> {
        let mut streamers: Vec<&User> = self
            .users
            .values()
            .filter(|u| u.streaming && u.id != *except)
            .collect();
        streamers.sort_by_key(|u| u.seq);
        streamers.into_iter().map(|u| u.id).collect()
    }

    /// Insert a user.
    ///
    /// Fails with `RoomNotFound` if the room was closed concurrently and
    /// with `AlreadyInRoom` if the client is already a member.
    pub fn join(&mut self, mut user: User) -> Result<(), EventError> {
        if self.closed {
            return Err(EventError::RoomNotFound(self.id.clone()));
        }
        if self.users.contains_key(&user.id) {
            return Err(EventError::AlreadyInRoom);
        }

        user.seq = self.next_seq;
        self.next_seq += 1;
        self.users.insert(user.id, user);
        Ok(())
    }

    /// Change a user's display name
    pub fn rename(&mut self, id: &ClientId, name: impl Into<String>) -> Result<(), EventError> {
        let user = self.users.get_mut(id).ok_or(EventError::StaleUser(*id))?;
        user.name = name.into();
        Ok(())
    }

    /// Set a user's streaming flag.
    ///
    /// Returns whether the flag changed.
    pub fn set_streaming(&mut self, id: &ClientId, streaming: bool) -> Result<bool, EventError> {
        let user = self.users.get_mut(id).ok_or(EventError::StaleUser(*id))?;
        let changed = user.streaming != streaming;
        user.streaming = streaming;
        Ok(changed)
    }

    /// Check if `host` already streams to `client`
    pub fn has_session(&self, host: &ClientId, client: &ClientId) -> bool {
        self.sessions
            .values()
            .any(|s| s.host == *host && s.client == *client)
    }

    /// Send one frame to one user, bounded by the write timeout
    pub(crate) async fn send(&mut self, to: &ClientId, frame: Outgoing) -> bool {
        let Some(user) = self.users.get(to) else {
            return false;
        };
        if self.broken.contains(to) {
            return false;
        }
        let sink = Arc::clone(&user.sink);

        match tokio::time::timeout(self.write_timeout, sink.write(frame)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(room = %self.id, client = %to, error = %e, "Write failed");
                self.broken.push(*to);
                false
            }
            Err(_) => {
                tracing::warn!(
                    room = %self.id,
                    client = %to,
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Write timed out"
                );
                self.broken.push(*to);
                false
            }
        }
    }

    /// Broadcast the current roster to every user.
    ///
    /// Each recipient gets its own copy with `you` set on its entry. A
    /// failing recipient does not stop the broadcast.
    pub async fn notify_info_changed(&mut self) {
        let roster = self.roster();

        for recipient in roster.iter().map(|u| u.id) {
            let users = roster
                .iter()
                .map(|u| RoomUser {
                    you: u.id == recipient,
                    ..u.clone()
                })
                .collect();
            let frame = Outgoing::Info {
                id: self.id.clone(),
                users,
            };
            self.send(&recipient, frame).await;
        }
    }

    /// Pair `streamer` with `viewer` and tell both ends to start negotiating
    pub async fn new_session(
        &mut self,
        streamer: ClientId,
        viewer: ClientId,
        turn: TurnAddrs,
    ) -> Result<SessionId, EventError> {
        for id in [streamer, viewer] {
            if !self.users.contains_key(&id) {
                return Err(EventError::StaleUser(id));
            }
        }

        let session = Session::new(streamer, viewer, turn);
        let sid = session.id;
        let ice = ice_servers(self.mode, &turn, self.turn_port);
        self.sessions.insert(sid, session);
        self.metrics.session_created();

        tracing::info!(
            room = %self.id,
            session = %sid,
            host = %streamer,
            client = %viewer,
            "Session created"
        );

        self.send(
            &streamer,
            Outgoing::HostSession {
                id: sid,
                peer: viewer,
                ice_servers: ice.clone(),
            },
        )
        .await;
        self.send(
            &viewer,
            Outgoing::ClientSession {
                id: sid,
                peer: streamer,
                ice_servers: ice,
            },
        )
        .await;

        Ok(sid)
    }

    /// Close a session and tell every participant except `initiator`
    pub(crate) async fn close_session(&mut self, sid: &SessionId, initiator: Option<ClientId>) {
        let Some(mut session) = self.sessions.remove(sid) else {
            return;
        };
        if !session.close() {
            return;
        }
        self.metrics.session_closed();
        tracing::debug!(room = %self.id, session = %sid, "Session closed");

        for peer in [session.host, session.client] {
            if Some(peer) != initiator {
                self.send(&peer, Outgoing::EndSession { sid: *sid }).await;
            }
        }
    }

    /// Close every session hosted by `host`
    pub async fn close_hosted_sessions(&mut self, host: &ClientId) {
        let hosted: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.host == *host)
            .map(|s| s.id)
            .collect();
        for sid in hosted {
            self.close_session(&sid, Some(*host)).await;
        }
    }

    /// Explicit teardown by one of the peers.
    ///
    /// Returns false if the session is unknown or `by` is not part of it.
    pub async fn end_session(&mut self, sid: &SessionId, by: &ClientId) -> bool {
        match self.sessions.get(sid) {
            Some(session) if session.involves(by) => {
                self.close_session(sid, Some(*by)).await;
                true
            }
            _ => {
                tracing::debug!(room = %self.id, session = %sid, client = %by, "Ignoring end of unknown session");
                false
            }
        }
    }

    /// Forward a signaling payload to the sender's counterpart.
    ///
    /// Messages for unknown or closed sessions, or from the wrong side, are
    /// dropped. Returns whether the frame was delivered.
    pub async fn relay(
        &mut self,
        sid: &SessionId,
        from: &ClientId,
        kind: RelayKind,
        value: serde_json::Value,
    ) -> bool {
        let target = match self.sessions.get(sid) {
            Some(session) if !session.is_closed() => {
                if session.side_of(from) != Some(kind.sender_side()) {
                    tracing::debug!(
                        room = %self.id,
                        session = %sid,
                        client = %from,
                        kind = %kind,
                        "Dropping relay from wrong side"
                    );
                    return false;
                }
                session.peer_of(from)
            }
            _ => None,
        };

        let Some(target) = target else {
            tracing::debug!(room = %self.id, session = %sid, kind = %kind, "Dropping relay for closed session");
            return false;
        };

        tracing::trace!(room = %self.id, session = %sid, kind = %kind, "Relaying");
        self.send(&target, kind.frame(*sid, *from, value)).await
    }

    /// Record that `from` reached connectivity in session `sid`
    pub fn mark_connected(&mut self, sid: &SessionId, from: &ClientId) -> bool {
        let Some(session) = self.sessions.get_mut(sid) else {
            tracing::debug!(room = %self.id, session = %sid, "Ignoring connected for unknown session");
            return false;
        };
        let Some(side) = session.side_of(from) else {
            return false;
        };

        let established = session.mark_connected(side);
        if established {
            tracing::info!(room = %self.id, session = %sid, "Session established");
        }
        established
    }

    /// Remove a user.
    ///
    /// Tears down every session involving the user, applies the owner
    /// policy and broadcasts the new roster. An emptied room is closed.
    pub async fn leave(&mut self, id: &ClientId) -> Option<User> {
        let user = self.users.remove(id)?;
        self.departed.push(*id);
        self.broken.retain(|b| b != id);

        let involved: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.involves(id))
            .map(|s| s.id)
            .collect();
        for sid in involved {
            self.close_session(&sid, Some(*id)).await;
        }

        if self.users.is_empty() {
            self.close(CloseReason::RoomClosed).await;
            return Some(user);
        }

        if user.owner && !self.users.values().any(|u| u.owner) {
            if self.close_on_owner_leave {
                tracing::info!(room = %self.id, owner = %id, "Owner left, closing room");
                self.close(CloseReason::RoomClosed).await;
                return Some(user);
            }
            self.promote_oldest();
        }

        self.notify_info_changed().await;
        Some(user)
    }

    fn promote_oldest(&mut self) {
        if let Some(user) = self.users.values_mut().min_by_key(|u| u.seq) {
            user.owner = true;
            tracing::info!(room = %self.id, owner = %user.id, "Promoted new owner");
        }
    }

    /// Close the room: end all sessions and disconnect remaining users
    pub(crate) async fn close(&mut self, reason: CloseReason) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.broken.clear();

        for (_, mut session) in self.sessions.drain() {
            if session.close() {
                self.metrics.session_closed();
            }
        }

        for (id, user) in self.users.drain() {
            self.departed.push(id);
            if tokio::time::timeout(self.write_timeout, user.sink.close(reason))
                .await
                .is_err()
            {
                tracing::warn!(room = %self.id, client = %id, "Close timed out");
            }
        }
    }

    /// Mark an empty room closed without touching users
    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Evict users whose writes failed, until no broken user remains
    pub async fn settle(&mut self) {
        while let Some(id) = self.broken.pop() {
            if let Some(user) = self.leave(&id).await {
                tracing::warn!(room = %self.id, client = %id, "Evicted unresponsive user");
                let _ = tokio::time::timeout(
                    self.write_timeout,
                    user.sink.close(CloseReason::Unresponsive),
                )
                .await;
            }
        }
    }

    /// Drain the IDs of users removed since the last call
    pub(crate) fn take_departed(&mut self) -> Vec<ClientId> {
        std::mem::take(&mut self.departed)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("users", &self.users.len())
            .field("sessions", &self.sessions.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
