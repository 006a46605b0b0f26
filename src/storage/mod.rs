//! Storage Module
//!
//! The data layer beneath the state machine.
//!
//! ## Core Concepts
//! - **Placement**: `placement` maps a key and a ring size to an ordered list
//!   of replica positions, derived deterministically from a SHA-256 digest so
//!   every peer computes the same list.
//! - **Tables**: `store` holds the per-node record table ({key, value,
//!   timestamp}, last-writer-wins) and the coordinator's lookup table
//!   ({key, ring_size}). Both persist as JSON snapshots and reload on open.
//! - **Journal**: `journal` records keys whose placement migration is in
//!   flight, so an interrupted stabilization is re-attempted later.

pub mod journal;
pub mod placement;
pub mod store;
