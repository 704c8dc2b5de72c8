//! Line codec for the chat relay.
//!
//! Inbound format (one line per message):
//!
//! `sender:recipient:payload`
//!
//! - `sender` is informational only and is **ignored**: the trusted
//!   sender identity comes from which connection delivered the line,
//!   never from message content.
//! - `recipient` selects unicast delivery when it is an integer peer
//!   identity, e.g. `me:2:hello`. An empty (or whitespace-only) field
//!   selects broadcast, e.g. `me::hello everyone`.
//! - `payload` is everything after the second separator and may itself
//!   contain `:`.
//!
//! Outbound format:
//!
//! - Unicast payloads are delivered verbatim.
//! - Broadcast payloads are delivered as `"<senderName>: <payload>"`.
//!
//! Whether a unicast target actually exists is the hub's call, not the
//! parser's; the parser only validates shape.

use relay_core::{Address, ConnId, MalformedReason};

/// Parse a single inbound line into a routing decision.
///
/// Never fails: unroutable input comes back as [`Address::Malformed`]
/// with the reason, so the caller can report it and move on.
pub fn parse_line(line: &str) -> Address {
    let Some((_sender, rest)) = line.split_once(':') else {
        return Address::Malformed(MalformedReason::MissingSender);
    };

    let Some((recipient, payload)) = rest.split_once(':') else {
        return Address::Malformed(MalformedReason::MissingRecipient);
    };

    let recipient = recipient.trim();
    if recipient.is_empty() {
        return Address::Broadcast {
            payload: payload.to_string(),
        };
    }

    match recipient.parse::<u64>() {
        Ok(id) => Address::Unicast {
            target: ConnId(id),
            payload: payload.to_string(),
        },
        Err(_) => Address::Malformed(MalformedReason::UnparseableRecipient),
    }
}

/// Render a broadcast payload for delivery, prefixed with the sender's
/// display name.
pub fn format_broadcast(sender_name: &str, payload: &str) -> String {
    format!("{}: {}", sender_name, payload)
}
