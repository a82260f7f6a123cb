//! Signaling relay kinds
//!
//! The hub never looks inside SDP or ICE payloads. It only checks that the
//! sender plays the right side and forwards the value to the counterpart.

use crate::id::{ClientId, SessionId};
use crate::protocol::message::Outgoing;

use super::state::Side;

/// Kind of relayed signaling message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// SDP offer, host → client
    HostOffer,
    /// SDP answer, client → host
    ClientAnswer,
    /// ICE candidate, host → client
    HostIce,
    /// ICE candidate, client → host
    ClientIce,
}

impl RelayKind {
    /// Side allowed to send this kind
    pub fn sender_side(&self) -> Side {
        match self {
            RelayKind::HostOffer | RelayKind::HostIce => Side::Host,
            RelayKind::ClientAnswer | RelayKind::ClientIce => Side::Client,
        }
    }

    /// Wire tag of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayKind::HostOffer => "hostoffer",
            RelayKind::ClientAnswer => "clientanswer",
            RelayKind::HostIce => "hostice",
            RelayKind::ClientIce => "clientice",
        }
    }

    /// Frame delivered to the counterpart
    pub fn frame(&self, sid: SessionId, from: ClientId, value: serde_json::Value) -> Outgoing {
        match self {
            RelayKind::HostOffer => Outgoing::HostOffer { sid, from, value },
            RelayKind::ClientAnswer => Outgoing::ClientAnswer { sid, from, value },
            RelayKind::HostIce => Outgoing::HostIce { sid, from, value },
            RelayKind::ClientIce => Outgoing::ClientIce { sid, from, value },
        }
    }
}

impl std::fmt::Display for RelayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
