//! Wire Protocol Module
//!
//! Peers speak a textual protocol: one `FIELD:VALUE` pair per line. The
//! first five lines form a fixed header (source, destination, type, source
//! id, piggybacked peer count), followed by the piggybacked peer blocks and
//! the type-specific fields.
//!
//! `message` defines the in-memory shape; `codec` converts it to and from
//! the wire text. Decoding is strict about the header: a missing or
//! misnamed header line, an unknown message type, or a truncated peer block
//! all reject the record.

pub mod codec;
pub mod message;

pub use codec::{decode, encode};
pub use message::{Message, Payload};

#[cfg(test)]
mod tests;
