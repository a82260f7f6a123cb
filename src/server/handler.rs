//! Application hooks
//!
//! Implement [`SignalHandler`] to authenticate connections or observe
//! disconnects. Every method has a default, so a unit struct is a valid
//! handler.

use std::net::SocketAddr;

use tokio_tungstenite::tungstenite::handshake::server::Request;

use crate::client::ClientInfo;

/// Outcome of the connection hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// Accept without an identity
    Anonymous,
    /// Accept as the named user; the name overrides requested usernames
    Authenticated(String),
    /// Refuse the upgrade
    Reject(String),
}

impl AuthResult {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, AuthResult::Reject(_))
    }
}

/// Handler trait for signaling server callbacks
pub trait SignalHandler: Send + Sync + 'static {
    /// Called during the WebSocket upgrade, before any event is read.
    ///
    /// The request carries the upgrade headers (cookies, bearer tokens).
    fn on_connection(&self, peer: SocketAddr, request: &Request) -> AuthResult {
        let _ = (peer, request);
        AuthResult::Anonymous
    }

    /// Called after the client has been removed from its room
    fn on_disconnect(&self, client: &ClientInfo) {
        let _ = client;
    }
}

/// Handler accepting everyone anonymously
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl SignalHandler for DefaultHandler {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handler_is_anonymous() {
        let request = Request::builder().uri("/stream").body(()).unwrap();
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let result = DefaultHandler.on_connection(peer, &request);
        assert_eq!(result, AuthResult::Anonymous);
        assert!(result.is_accepted());
        assert!(!AuthResult::Reject("banned".into()).is_accepted());
    }
}
