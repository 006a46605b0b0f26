//! Replicated Key-Value Store Library
//!
//! This library crate defines the core modules of a coordinator-mediated,
//! replicated key-value store. It is the foundation for the peer binary
//! (`main.rs`), which can run in any of the three roles.
//!
//! ## Architecture Modules
//! The system is composed of six loosely coupled subsystems:
//!
//! - **`protocol`**: The wire layer. Message types and the newline-delimited
//!   `FIELD:VALUE` text codec spoken between peers.
//! - **`membership`**: The cluster view. Peer records keyed by id, merged by
//!   `last_updated` precedence, disseminated by piggybacking and gossip.
//! - **`storage`**: The data layer. Per-node record table, the coordinator's
//!   key-to-ring-size lookup table, the stabilization journal, and the
//!   digest-based replica placement function.
//! - **`transport`**: One-connection-per-exchange TCP send and listen, with a
//!   single configured timeout bounding every network operation.
//! - **`node`**: The state machine. Role-specific dispatch driving join,
//!   read, write, delete, stabilization, and gossip.
//! - **`config`**: Static options (port, replication factor, timeouts) read
//!   from the environment.

pub mod config;
pub mod error;
pub mod membership;
pub mod node;
pub mod protocol;
pub mod storage;
pub mod transport;
