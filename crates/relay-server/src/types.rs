//! Shared types for the relay TCP server.
//!
//! This module defines:
//! - channel aliases for a peer's outbound queue
//! - channel aliases between connections and the hub loop
//! - `HubEvent`: everything the hub loop can be asked to do

use relay_core::ConnId;
use tokio::sync::{mpsc, oneshot};

/// Outbound messages queued for one peer.
///
/// The channel is **bounded**: the hub enqueues with `try_send`, and a
/// full queue gets the peer evicted rather than the hub loop blocked.
pub type OutboundTx = mpsc::Sender<String>;
pub type OutboundRx = mpsc::Receiver<String>;

/// One event on the hub's serialized decision loop.
///
/// All registry mutations and all routing decisions flow through these,
/// one at a time; the registry itself never leaves the hub task.
#[derive(Debug)]
pub enum HubEvent {
    /// Admit a peer. The hub assigns its identity and replies with it.
    Register {
        name: Option<String>,
        sender: OutboundTx,
        reply: oneshot::Sender<ConnId>,
    },

    /// Retire a peer. Absent identities are a no-op.
    Unregister { id: ConnId },

    /// Route one raw inbound line from `sender`.
    Dispatch { sender: ConnId, raw: String },

    /// Reply with the number of registered peers.
    PeerCount { reply: oneshot::Sender<usize> },
}

/// Channel from connections into the hub loop.
pub type HubTx = mpsc::UnboundedSender<HubEvent>;
pub type HubRx = mpsc::UnboundedReceiver<HubEvent>;
