//! Addressing types used by the relay.
//!
//! These are **transport-agnostic** logical messages: an inbound chat line
//! parses into exactly one [`Address`], which is everything the hub needs
//! to make a routing decision.
//!
//! Note: the line parser itself lives in the `relay-protocol` crate; this
//! module is purely logical.

use std::fmt;

use crate::conn_id::ConnId;

/// Routing decision parsed from one inbound chat line.
///
/// The sender field of the wire format never appears here: the trusted
/// sender identity comes from which connection delivered the line, not
/// from message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Deliver the payload to exactly one peer.
    Unicast { target: ConnId, payload: String },

    /// Deliver the payload to every registered peer except the sender.
    Broadcast { payload: String },

    /// The line could not be routed; carries the reason for diagnostics.
    Malformed(MalformedReason),
}

/// Why an inbound line failed to parse.
///
/// Malformed input is never fatal and never surfaced to the sender; the
/// hub only reports it on the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// No separator at all, so not even a sender field.
    MissingSender,

    /// A sender field but no second separator for the recipient.
    MissingRecipient,

    /// The recipient field is present but is not an integer identity.
    UnparseableRecipient,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MalformedReason::MissingSender => "no sender field",
            MalformedReason::MissingRecipient => "no recipient field",
            MalformedReason::UnparseableRecipient => "recipient is not an identity",
        };
        f.write_str(text)
    }
}
