//! Session state machine
//!
//! Tracks one host→viewer negotiation from pairing to teardown.
//!
//! ```text
//!   Negotiating ──(both sides report connected)──► Established
//!        │                                              │
//!        └──────────(leave / disconnect / end)──────────┴──► Closed
//! ```
//!
//! `Closed` is terminal.

use std::time::Instant;

use crate::id::{ClientId, SessionId};
use crate::turn::TurnAddrs;

/// Negotiation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Offer/answer/candidates flowing
    Negotiating,
    /// Both ends reported connectivity
    Established,
    /// Torn down
    Closed,
}

/// Which end of a session a client is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The streaming peer
    Host,
    /// The viewing peer
    Client,
}

/// One negotiation session between a streamer and a viewer
#[derive(Debug)]
pub struct Session {
    /// Session ID
    pub id: SessionId,

    /// Streaming peer
    pub host: ClientId,

    /// Viewing peer
    pub client: ClientId,

    /// Relay addresses handed to both ends
    pub turn: TurnAddrs,

    state: SessionState,
    host_connected: bool,
    client_connected: bool,

    /// When the session was paired
    pub created_at: Instant,

    /// When both ends reported connectivity
    pub established_at: Option<Instant>,
}

impl Session {
    /// Pair `host` with `client`
    pub fn new(host: ClientId, client: ClientId, turn: TurnAddrs) -> Self {
        Self {
            id: SessionId::new(),
            host,
            client,
            turn,
            state: SessionState::Negotiating,
            host_connected: false,
            client_connected: false,
            created_at: Instant::now(),
            established_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Check if `id` is one of the two peers
    pub fn involves(&self, id: &ClientId) -> bool {
        self.host == *id || self.client == *id
    }

    /// Side `id` plays in this session
    pub fn side_of(&self, id: &ClientId) -> Option<Side> {
        if self.host == *id {
            Some(Side::Host)
        } else if self.client == *id {
            Some(Side::Client)
        } else {
            None
        }
    }

    /// The counterpart of `id`
    pub fn peer_of(&self, id: &ClientId) -> Option<ClientId> {
        match self.side_of(id)? {
            Side::Host => Some(self.client),
            Side::Client => Some(self.host),
        }
    }

    /// Record that `side` reached connectivity.
    ///
    /// Returns true when this call moved the session to `Established`.
    pub fn mark_connected(&mut self, side: Side) -> bool {
        if self.state != SessionState::Negotiating {
            return false;
        }

        match side {
            Side::Host => self.host_connected = true,
            Side::Client => self.client_connected = true,
        }

        if self.host_connected && self.client_connected {
            self.state = SessionState::Established;
            self.established_at = Some(Instant::now());
            return true;
        }
        false
    }

    /// Close the session.
    ///
    /// Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let host = ClientId::new();
        let client = ClientId::new();
        let mut session = Session::new(host, client, TurnAddrs::default());

        assert_eq!(session.state(), SessionState::Negotiating);

        assert!(!session.mark_connected(Side::Host));
        assert_eq!(session.state(), SessionState::Negotiating);

        assert!(session.mark_connected(Side::Client));
        assert_eq!(session.state(), SessionState::Established);
        assert!(session.established_at.is_some());

        assert!(session.close());
        assert!(session.is_closed());
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut session = Session::new(ClientId::new(), ClientId::new(), TurnAddrs::default());

        assert!(session.close());
        assert!(!session.close());

        assert!(!session.mark_connected(Side::Host));
        assert!(!session.mark_connected(Side::Client));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_repeated_connected_from_one_side() {
        let mut session = Session::new(ClientId::new(), ClientId::new(), TurnAddrs::default());

        assert!(!session.mark_connected(Side::Host));
        assert!(!session.mark_connected(Side::Host));
        assert_eq!(session.state(), SessionState::Negotiating);
    }

    #[test]
    fn test_sides_and_peers() {
        let host = ClientId::new();
        let client = ClientId::new();
        let stranger = ClientId::new();
        let session = Session::new(host, client, TurnAddrs::default());

        assert_eq!(session.side_of(&host), Some(Side::Host));
        assert_eq!(session.side_of(&client), Some(Side::Client));
        assert_eq!(session.side_of(&stranger), None);

        assert_eq!(session.peer_of(&host), Some(client));
        assert_eq!(session.peer_of(&client), Some(host));
        assert!(session.involves(&host));
        assert!(!session.involves(&stranger));
    }
}
