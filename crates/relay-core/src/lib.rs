//! relay-core
//!
//! Pure chat relay logic:
//! - peer identity
//! - addressing (how one inbound message is routed)
//! - roster (registry of connected peers)

pub mod conn_id;
pub mod messages;
pub mod roster;

pub use conn_id::ConnId;
pub use messages::{Address, MalformedReason};
pub use roster::{Peer, Roster, DEFAULT_NAME};
