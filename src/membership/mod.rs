//! Membership Module
//!
//! Every peer carries a view of the cluster: a map from peer id to peer
//! record. Only the Coordinator's view is authoritative; other peers hold a
//! snapshot refreshed by gossip and by the network blocks piggybacked on
//! received messages.
//!
//! ## Core Mechanisms
//! - **Merge rule**: an incoming record replaces the local one only when its
//!   `last_updated` stamp is strictly fresher. Duplicate deliveries are
//!   benign, and `last_updated` never moves backwards.
//! - **Reserved ids**: id 0 is the Coordinator and id -1 the Client; neither
//!   counts toward the ring. Data-bearing peers have positive ids.
//! - **Failure marking**: a peer is flagged `is_down` the first time an
//!   expected response does not arrive in time, and cleared on the next
//!   successful exchange. There is no dedicated heartbeat.

pub mod types;
pub mod view;

#[cfg(test)]
mod tests;
