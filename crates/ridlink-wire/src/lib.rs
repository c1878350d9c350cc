//! ridlink Wire Protocol - JSON-over-stream format
//!
//! The detection device writes one JSON object per message onto a byte
//! stream with no length prefix and no delimiter:
//! - Framing: brace balance marks message boundaries
//! - Decoding: a discriminator key selects the message shape
//! - Fields: every value is optional and parsed leniently

pub mod decode;
pub mod fields;
pub mod framer;

pub use decode::*;
pub use framer::*;
