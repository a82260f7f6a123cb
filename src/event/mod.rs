//! Inbound events
//!
//! Every frame a client sends decodes into one [`Event`]. Events run against
//! the shared [`Rooms`] registry on behalf of the sending client; an error
//! is reported back to that client only.
//!
//! New kinds are added by implementing [`Event`] and registering a decoder
//! with [`crate::protocol::EventRegistry`].

use std::future::Future;
use std::pin::Pin;

use crate::client::ClientInfo;
use crate::error::EventError;
use crate::registry::Rooms;

pub mod create;
pub mod join;
pub mod leave;
pub mod name;
pub mod relay;
pub mod share;

pub use create::Create;
pub use join::Join;
pub use leave::Leave;
pub use name::Name;
pub use relay::{Connected, EndSession, Relay};
pub use share::{Share, StopShare};

/// Boxed future returned by [`Event::execute`]
pub type EventFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EventError>> + Send + 'a>>;

/// A decoded inbound event
pub trait Event: Send + 'static {
    /// Run the event for `client`
    fn execute<'a>(self: Box<Self>, rooms: &'a Rooms, client: &'a ClientInfo) -> EventFuture<'a>;
}
