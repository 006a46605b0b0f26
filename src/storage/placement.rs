//! Replica placement.
//!
//! Maps a key to an ordered list of replica positions on the ring. Positions
//! index into the sorted-by-id list of data-bearing peers, so the function
//! must be deterministic across peers: same key, same ring size, same list.
//!
//! ## Mechanism
//! The key is digested with SHA-256. Consecutive 4-byte windows of the digest
//! are read as big-endian integers and reduced modulo the ring size; a
//! position that was already chosen is advanced by one (modulo the ring size)
//! until a free position is found. Scanning stops once
//! `min(ring_size, replication_factor)` distinct positions are collected.

use sha2::{Digest, Sha256};

/// Ordered replica positions for `key` on a ring of `ring_size` data peers.
///
/// Returns `min(ring_size, replication_factor)` distinct indices in the range
/// `0..ring_size`. An empty ring yields an empty list.
pub fn replicas_for(key: &str, ring_size: usize, replication_factor: usize) -> Vec<usize> {
    if ring_size == 0 {
        return Vec::new();
    }

    let wanted = replication_factor.min(ring_size);
    let digest = Sha256::digest(key.as_bytes());

    let mut chosen: Vec<usize> = Vec::with_capacity(wanted);
    for window in digest.windows(4) {
        let raw = u32::from_be_bytes([window[0], window[1], window[2], window[3]]);
        let mut position = raw as usize % ring_size;

        while chosen.contains(&position) {
            position = (position + 1) % ring_size;
        }
        chosen.push(position);

        if chosen.len() == wanted {
            break;
        }
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_is_deterministic() {
        for key in ["A", "K", "some-longer-key", ""] {
            let first = replicas_for(key, 5, 3);
            let second = replicas_for(key, 5, 3);
            assert_eq!(first, second, "key {:?}", key);
        }
    }

    #[test]
    fn test_placement_indices_distinct_and_in_range() {
        for i in 0..500 {
            let key = format!("key_{}", i);
            let replicas = replicas_for(&key, 7, 3);

            let mut seen = std::collections::HashSet::new();
            for idx in &replicas {
                assert!(*idx < 7, "index {} out of range for key {}", idx, key);
                assert!(seen.insert(*idx), "duplicate index for key {}", key);
            }
        }
    }

    #[test]
    fn test_placement_length_is_min_of_ring_and_factor() {
        assert_eq!(replicas_for("K", 5, 2).len(), 2);
        assert_eq!(replicas_for("K", 1, 2).len(), 1);
        assert_eq!(replicas_for("K", 3, 3).len(), 3);
        assert_eq!(replicas_for("K", 2, 10).len(), 2);
    }

    #[test]
    fn test_placement_empty_ring() {
        assert!(replicas_for("K", 0, 2).is_empty());
    }

    #[test]
    fn test_placement_spreads_keys() {
        let mut counts = std::collections::HashMap::new();
        for i in 0..1000 {
            let key = format!("book_{}", i);
            let primary = replicas_for(&key, 8, 1)[0];
            *counts.entry(primary).or_insert(0usize) += 1;
        }

        assert_eq!(counts.len(), 8, "every position should receive keys");
        for (position, count) in counts {
            assert!(count > 50, "position {} starved with {} keys", position, count);
        }
    }

    #[test]
    fn test_placement_changes_with_ring_size() {
        // Not required by the contract, but the whole point of stabilization
        // is that placements generally move when the ring grows.
        let moved = (0..100)
            .map(|i| format!("key_{}", i))
            .filter(|key| replicas_for(key, 2, 2) != replicas_for(key, 3, 2))
            .count();
        assert!(moved > 0);
    }
}
