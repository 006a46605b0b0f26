//! Gossip dissemination of join introductions.
//!
//! When the Coordinator admits a peer it introduces it to one random member;
//! each recipient merges the piggybacked view and may forward the
//! introduction to one further random member, decrementing the hop count.
//! The hop count is advisory and duplicates are benign: the merge rule makes
//! redelivery a no-op.

use crate::protocol::Payload;

use super::Node;

/// Coordinator side: announce a freshly admitted peer to the ring.
///
/// Skipped until the ring has at least two members; the initial hop count
/// is a quarter of the ring size.
pub async fn initiate(node: &Node, new_id: i64) {
    let ring_size = node.view.ring_size();
    if ring_size < 2 {
        return;
    }

    let Some(target) = node.view.random_data_peer(&[new_id]) else {
        return;
    };
    let hop_count = (ring_size / 4) as u32;

    tracing::info!(
        "Introducing peer {} to peer {} (hops {})",
        new_id,
        target.id,
        hop_count
    );

    let msg = node.outbound(
        &target.address,
        Payload::JoinIntroduction { new_id, hop_count },
    );
    if !node.transport.send(&target.address, &msg).await {
        node.view.mark_down(target.id);
    }
}

/// Relay side: forward the introduction while hops remain.
///
/// The forward target excludes this peer and the introduced peer itself.
pub async fn relay(node: &Node, new_id: i64, hop_count: u32) {
    if hop_count == 0 {
        return;
    }

    let Some(target) = node.view.random_data_peer(&[node.id, new_id]) else {
        return;
    };

    tracing::debug!(
        "Relaying introduction of peer {} to peer {} (hops left {})",
        new_id,
        target.id,
        hop_count - 1
    );

    let msg = node.outbound(
        &target.address,
        Payload::JoinIntroduction {
            new_id,
            hop_count: hop_count - 1,
        },
    );
    if !node.transport.send(&target.address, &msg).await {
        node.view.mark_down(target.id);
    }
}
