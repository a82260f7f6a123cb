//! Per-pair negotiation sessions
//!
//! A session pairs one streaming user with one viewer inside a room and
//! relays SDP offers/answers and ICE candidates between them.

pub mod relay;
pub mod state;

pub use relay::RelayKind;
pub use state::{Session, SessionState, Side};
