//! Room registry
//!
//! The registry owns every room and the index of which client sits in
//! which room.
//!
//! # Architecture
//!
//! ```text
//!                            Arc<Rooms>
//!                 ┌──────────────────────────────┐
//!                 │ RwLock<Directory {           │
//!                 │   rooms: RoomId → Arc<Mutex< │
//!                 │     Room { users, sessions } │
//!                 │   >>,                        │
//!                 │   memberships: ClientId →    │
//!                 │     RoomId,                  │
//!                 │ }>                           │
//!                 └──────────────┬───────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        ▼                       ▼                       ▼
//!   [connection]            [connection]            [connection]
//!   dispatch(join)          dispatch(share)         disconnect()
//!        │                       │                       │
//!        └──► room.lock() ──► mutate ──► broadcast ──► sinks
//! ```
//!
//! Rooms are destroyed as soon as their last user leaves. A destroyed room
//! is flagged closed under its own lock first, so a join holding a stale
//! handle fails with `RoomNotFound` instead of resurrecting it.

pub mod config;
pub mod names;
pub mod room;
pub mod store;
pub mod user;

pub use config::{AuthMode, RegistryConfig};
pub use room::{Room, RoomHandle, RoomSettings};
pub use store::Rooms;
pub use user::User;
