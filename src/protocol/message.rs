//! Outbound frames
//!
//! Every frame is a JSON object tagged with `type`:
//!
//! ```text
//! info           room snapshot, personalized per recipient ("you")
//! hostsession    you stream to `peer` in session `id`
//! clientsession  you view `peer` in session `id`
//! hostoffer      \
//! clientanswer    | relayed verbatim from `from`
//! hostice         |
//! clientice      /
//! endsession     session `sid` is gone
//! error          the event you sent failed
//! ```

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::id::{ClientId, RoomId, SessionId};
use crate::turn::TurnAddrs;

/// How peers in a room reach each other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Host candidates only (same network)
    Local,
    /// STUN reflexive candidates
    Stun,
    /// STUN plus TURN relay
    #[default]
    Turn,
}

/// ICE server entry handed to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
}

/// Build the ICE server list for a room mode and relay addresses
pub fn ice_servers(mode: ConnectionMode, turn: &TurnAddrs, port: u16) -> Vec<IceServer> {
    let host = |ip: IpAddr| match ip {
        IpAddr::V4(v4) => format!("{}:{}", v4, port),
        IpAddr::V6(v6) => format!("[{}]:{}", v6, port),
    };

    match mode {
        ConnectionMode::Local => Vec::new(),
        ConnectionMode::Stun => vec![IceServer {
            urls: turn.iter().map(|ip| format!("stun:{}", host(ip))).collect(),
        }],
        ConnectionMode::Turn => {
            let mut urls: Vec<String> = turn.iter().map(|ip| format!("stun:{}", host(ip))).collect();
            urls.extend(turn.iter().map(|ip| format!("turn:{}", host(ip))));
            vec![IceServer { urls }]
        }
    }
}

/// One entry of the room roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    pub id: ClientId,
    pub name: String,
    pub streaming: bool,
    pub owner: bool,
    /// Whether this entry is the recipient
    pub you: bool,
}

/// Frame sent from the hub to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outgoing {
    /// Room membership snapshot
    Info { id: RoomId, users: Vec<RoomUser> },

    /// Recipient streams to `peer`
    HostSession {
        id: SessionId,
        peer: ClientId,
        #[serde(rename = "iceServers")]
        ice_servers: Vec<IceServer>,
    },

    /// Recipient views `peer`
    ClientSession {
        id: SessionId,
        peer: ClientId,
        #[serde(rename = "iceServers")]
        ice_servers: Vec<IceServer>,
    },

    HostOffer {
        sid: SessionId,
        from: ClientId,
        value: serde_json::Value,
    },

    ClientAnswer {
        sid: SessionId,
        from: ClientId,
        value: serde_json::Value,
    },

    HostIce {
        sid: SessionId,
        from: ClientId,
        value: serde_json::Value,
    },

    ClientIce {
        sid: SessionId,
        from: ClientId,
        value: serde_json::Value,
    },

    /// Session was torn down
    EndSession { sid: SessionId },

    /// Event sent by the recipient failed
    Error { kind: String, message: String },
}

impl Outgoing {
    /// Error frame for a failed event
    pub fn error(err: &EventError) -> Self {
        Outgoing::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }

    /// Serialize to the JSON wire representation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why the hub closed a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Room owner left and the room was configured to close
    RoomClosed,
    /// Writes to the client failed or timed out
    Unresponsive,
    /// Server is shutting down
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::RoomClosed => f.write_str("room closed"),
            CloseReason::Unresponsive => f.write_str("unresponsive"),
            CloseReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use serde_json::json;

    use super::*;

    #[test]
    fn test_info_wire_shape() {
        let id = ClientId::new();
        let frame = Outgoing::Info {
            id: RoomId::new("room"),
            users: vec![RoomUser {
                id,
                name: "Alice".into(),
                streaming: false,
                owner: true,
                you: true,
            }],
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "info");
        assert_eq!(value["id"], "room");
        assert_eq!(value["users"][0]["name"], "Alice");
        assert_eq!(value["users"][0]["owner"], true);
    }

    #[test]
    fn test_session_frame_uses_ice_servers_key() {
        let frame = Outgoing::HostSession {
            id: SessionId::new(),
            peer: ClientId::new(),
            ice_servers: vec![],
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "hostsession");
        assert!(value.get("iceServers").is_some());
    }

    #[test]
    fn test_relay_frame_keeps_value() {
        let frame = Outgoing::ClientAnswer {
            sid: SessionId::new(),
            from: ClientId::new(),
            value: json!({"sdp": "v=0"}),
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "clientanswer");
        assert_eq!(value["value"]["sdp"], "v=0");
    }

    #[test]
    fn test_error_frame() {
        let frame = Outgoing::error(&EventError::NotInRoom);
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "not_in_room");
        assert_eq!(value["message"], "not in a room");
    }

    #[test]
    fn test_ice_servers_by_mode() {
        let turn = TurnAddrs::new(Some(Ipv4Addr::new(1, 2, 3, 4)), Some(Ipv6Addr::LOCALHOST));

        assert!(ice_servers(ConnectionMode::Local, &turn, 3478).is_empty());

        let stun = ice_servers(ConnectionMode::Stun, &turn, 3478);
        assert_eq!(
            stun[0].urls,
            vec!["stun:1.2.3.4:3478".to_string(), "stun:[::1]:3478".to_string()]
        );

        let relay = ice_servers(ConnectionMode::Turn, &turn, 3478);
        assert_eq!(relay[0].urls.len(), 4);
        assert!(relay[0].urls.contains(&"turn:1.2.3.4:3478".to_string()));
    }

    #[test]
    fn test_connection_mode_default_is_turn() {
        assert_eq!(ConnectionMode::default(), ConnectionMode::Turn);
        let mode: ConnectionMode = serde_json::from_str("\"stun\"").unwrap();
        assert_eq!(mode, ConnectionMode::Stun);
    }
}
