//! Registry of connected peers.
//!
//! The roster is the single source of truth for who is connected. It is
//! meant to be owned by exactly one task (the hub loop); nothing in here
//! is synchronized, and nothing needs to be as long as that ownership
//! holds.
//!
//! The endpoint type is generic so the registry logic stays pure: the
//! server instantiates `Roster<OutboundTx>` with a channel sender per
//! peer, while tests can use any placeholder.

use std::collections::HashMap;

use crate::conn_id::ConnId;

/// Display name substituted when a peer does not supply one.
pub const DEFAULT_NAME: &str = "Client";

/// A registered peer: its display name plus the endpoint used to hand it
/// outbound messages.
#[derive(Debug)]
pub struct Peer<T> {
    pub name: String,
    pub endpoint: T,
}

/// Registry of connected peers, keyed by identity.
///
/// Identities are assigned here, from a monotonically increasing counter,
/// and are unique for the lifetime of the roster. Iteration order over
/// peers carries no contract.
#[derive(Debug)]
pub struct Roster<T> {
    next_id: u64,
    peers: HashMap<ConnId, Peer<T>>,
}

impl<T> Default for Roster<T> {
    fn default() -> Self {
        Roster::new()
    }
}

impl<T> Roster<T> {
    /// Create an empty roster.
    pub fn new() -> Self {
        Roster {
            next_id: 0,
            peers: HashMap::new(),
        }
    }

    /// Admit a peer, assigning the next identity.
    ///
    /// A missing or empty display name falls back to [`DEFAULT_NAME`].
    /// Registration cannot fail.
    pub fn register(&mut self, name: Option<String>, endpoint: T) -> ConnId {
        self.next_id += 1;
        let id = ConnId(self.next_id);

        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_NAME.to_string(),
        };

        self.peers.insert(id, Peer { name, endpoint });
        id
    }

    /// Remove a peer, returning it if it was still registered.
    ///
    /// Removing an absent identity is a no-op, so teardown paths that race
    /// each other can all call this safely.
    pub fn unregister(&mut self, id: ConnId) -> Option<Peer<T>> {
        self.peers.remove(&id)
    }

    /// Whether the identity is currently registered.
    pub fn contains(&self, id: ConnId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Display name of a registered peer.
    pub fn name_of(&self, id: ConnId) -> Option<&str> {
        self.peers.get(&id).map(|peer| peer.name.as_str())
    }

    /// Endpoint of a registered peer.
    pub fn endpoint(&self, id: ConnId) -> Option<&T> {
        self.peers.get(&id).map(|peer| &peer.endpoint)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Snapshot of everyone a broadcast from `sender` goes to: all
    /// registered peers except the sender itself.
    ///
    /// Returned as an owned list so the caller can mutate the roster
    /// (e.g. evict a slow peer) while walking it.
    pub fn broadcast_targets(&self, sender: ConnId) -> Vec<ConnId> {
        self.peers.keys().copied().filter(|&id| id != sender).collect()
    }
}
