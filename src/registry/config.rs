//! Registry configuration

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::message::ConnectionMode;
use crate::turn::{StaticTurnIps, TurnIpProvider};

/// Who may create rooms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Anyone
    #[default]
    None,
    /// Login required for rooms relaying through TURN
    Turn,
    /// Login required for every room
    All,
}

impl AuthMode {
    /// Check if a client may create a room in `mode`
    pub fn may_create(&self, authenticated: bool, mode: ConnectionMode) -> bool {
        match self {
            AuthMode::None => true,
            AuthMode::Turn => authenticated || mode != ConnectionMode::Turn,
            AuthMode::All => authenticated,
        }
    }
}

/// Registry configuration options
#[derive(Clone)]
pub struct RegistryConfig {
    /// Source of TURN relay addresses
    pub turn_provider: Arc<dyn TurnIpProvider>,

    /// Upper bound for one TURN address lookup
    pub turn_timeout: Duration,

    /// Upper bound for one outbound write; slower clients are evicted
    pub write_timeout: Duration,

    /// Room creation policy
    pub auth_mode: AuthMode,

    /// Port advertised in STUN/TURN urls
    pub turn_port: u16,

    /// Longest accepted client-chosen room ID
    pub max_room_id_len: usize,

    /// Rooms left empty this long are removed by cleanup
    pub empty_room_timeout: Duration,

    /// Interval of the background cleanup task
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            turn_provider: Arc::new(StaticTurnIps::default()),
            turn_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(5),
            auth_mode: AuthMode::None,
            turn_port: 3478,
            max_room_id_len: 100,
            empty_room_timeout: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl RegistryConfig {
    /// Set the TURN address provider
    pub fn turn_provider(mut self, provider: impl TurnIpProvider) -> Self {
        self.turn_provider = Arc::new(provider);
        self
    }

    /// Set the TURN lookup timeout
    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    /// Set the per-write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the room creation policy
    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Set the advertised TURN port
    pub fn turn_port(mut self, port: u16) -> Self {
        self.turn_port = port;
        self
    }

    /// Set how long an empty room may linger
    pub fn empty_room_timeout(mut self, timeout: Duration) -> Self {
        self.empty_room_timeout = timeout;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("turn_timeout", &self.turn_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("auth_mode", &self.auth_mode)
            .field("turn_port", &self.turn_port)
            .field("max_room_id_len", &self.max_room_id_len)
            .field("empty_room_timeout", &self.empty_room_timeout)
            .field("cleanup_interval", &self.cleanup_interval)
            .finish_non_exhaustive()
    }
}
