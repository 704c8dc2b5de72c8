//! Identity handle for connected peers.

use std::fmt;

/// Identifier for a connected peer.
///
/// This is intentionally opaque; we just guarantee uniqueness over the
/// lifetime of the process. Identities are assigned by the roster at
/// registration, never chosen by the connection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
