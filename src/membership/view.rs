use dashmap::DashMap;
use rand::Rng;

use super::types::{now_seconds, Peer, PeerStatus};

/// A peer's view of the cluster: peer records keyed by id.
///
/// The dispatch loop is the only writer, but handles are shared with the
/// client-facing task, so the map itself is concurrent.
pub struct MembershipView {
    peers: DashMap<i64, Peer>,
}

impl MembershipView {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Number of data-bearing peers in the view. The Coordinator (id 0) and
    /// clients (id -1) are excluded.
    pub fn ring_size(&self) -> usize {
        self.peers
            .iter()
            .filter(|entry| entry.value().is_data_bearing())
            .count()
    }

    pub fn get(&self, id: i64) -> Option<Peer> {
        self.peers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.peers.contains_key(&id)
    }

    /// Unconditionally install a record, as the owner of fresh information
    /// (join admission, self-insertion). Gossiped records go through
    /// [`merge`](Self::merge) instead.
    pub fn insert(&self, peer: Peer) {
        self.peers.insert(peer.id, peer);
    }

    /// Apply the merge rule to one incoming record. Returns `true` when the
    /// record was installed or replaced the local one.
    pub fn merge(&self, incoming: Peer) -> bool {
        match self.peers.get_mut(&incoming.id) {
            Some(mut existing) => {
                if incoming.last_updated > existing.last_updated {
                    tracing::debug!(
                        "Updating peer {}: last_updated {} -> {}",
                        incoming.id,
                        existing.last_updated,
                        incoming.last_updated,
                    );
                    *existing = incoming;
                    true
                } else {
                    false
                }
            }
            None => {
                tracing::info!(
                    "Discovered peer {} at {}",
                    incoming.id,
                    incoming.address
                );
                self.peers.insert(incoming.id, incoming);
                true
            }
        }
    }

    pub fn merge_all<'a>(&self, incoming: impl IntoIterator<Item = &'a Peer>) {
        for peer in incoming {
            self.merge(peer.clone());
        }
    }

    /// Refresh a peer's `last_updated` after hearing from it directly.
    pub fn touch(&self, id: i64) {
        if let Some(mut peer) = self.peers.get_mut(&id) {
            peer.last_updated = now_seconds();
        }
    }

    pub fn mark_down(&self, id: i64) {
        if let Some(mut peer) = self.peers.get_mut(&id) {
            if !peer.is_down {
                tracing::warn!("Peer {} at {} marked down", id, peer.address);
            }
            peer.is_down = true;
        }
    }

    pub fn mark_up(&self, id: i64) {
        if let Some(mut peer) = self.peers.get_mut(&id) {
            peer.is_down = false;
            peer.last_updated = now_seconds();
        }
    }

    /// Data-bearing peers ordered by id. Placement indices point into this
    /// list, so the ordering must be identical on every peer.
    pub fn data_peers_sorted(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self
            .peers
            .iter()
            .filter(|entry| entry.value().is_data_bearing())
            .map(|entry| entry.value().clone())
            .collect();
        peers.sort_by_key(|peer| peer.id);
        peers
    }

    /// Uniform random data-bearing peer, skipping excluded ids and peers
    /// currently marked down. Used to pick gossip targets.
    pub fn random_data_peer(&self, exclude: &[i64]) -> Option<Peer> {
        let candidates: Vec<Peer> = self
            .peers
            .iter()
            .filter(|entry| {
                let peer = entry.value();
                peer.is_data_bearing() && !peer.is_down && !exclude.contains(&peer.id)
            })
            .map(|entry| entry.value().clone())
            .collect();

        if candidates.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[idx].clone())
    }

    /// Next positive id for an admitted peer: one past the highest assigned.
    pub fn next_id(&self) -> i64 {
        self.peers
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| *id > 0)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// The peer blocks piggybacked on an outbound message to `dest_address`.
    ///
    /// Clients and the receiving host's own record are omitted; the sender's
    /// own block is stamped with the current instant.
    pub fn snapshot_for(&self, self_id: i64, dest_address: &str) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self
            .peers
            .iter()
            .filter(|entry| {
                let peer = entry.value();
                peer.status != PeerStatus::Client && peer.address != dest_address
            })
            .map(|entry| entry.value().clone())
            .collect();
        peers.sort_by_key(|peer| peer.id);

        let now = now_seconds();
        for peer in peers.iter_mut() {
            if peer.id == self_id {
                peer.last_updated = now;
            }
        }
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for MembershipView {
    fn default() -> Self {
        Self::new()
    }
}
