//! relay-protocol
//!
//! Text line protocol for the chat relay:
//! - parsing inbound `sender:recipient:payload` lines into routing
//!   decisions
//! - formatting outbound broadcast lines

pub mod text_codec;

pub use text_codec::{format_broadcast, parse_line};
