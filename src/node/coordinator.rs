//! Coordinator-side message handling and replica orchestration.
//!
//! The Coordinator is the only peer that talks to clients. For every client
//! operation it computes the replica set for the key, fans the matching
//! request out to the replicas one at a time, reconciles the answers, and
//! replies. A replica that fails to answer in time is marked down and
//! skipped; a replica that answers refutes its down flag.
//!
//! Reads reconcile by last-writer-wins: the replica reporting the greatest
//! record timestamp wins, ties broken by the lowest replica id so that every
//! run of the same read picks the same winner.

use crate::error::NodeError;
use crate::membership::types::{Peer, PeerStatus};
use crate::protocol::{Message, Payload};
use crate::storage::placement::replicas_for;
use crate::storage::store::Record;

use super::Node;

/// Dispatch one message for the Coordinator role.
pub async fn handle(node: &mut Node, msg: &Message) -> Option<Message> {
    match &msg.payload {
        Payload::JoinRequest => Some(admit(node, msg)),

        Payload::ClientReadRequest { key } => {
            let reply = match read(node, key, true).await {
                Ok(record) => Payload::ClientReadResponse {
                    key: record.key,
                    value: record.value,
                    timestamp: record.timestamp,
                },
                Err(e) => {
                    tracing::info!("Read of '{}' failed: {}", key, e);
                    Payload::FailureIndication {
                        reason: "Key does not exist".to_string(),
                    }
                }
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::ClientWriteRequest { key, value } => {
            let reply = match write(node, key, value).await {
                Ok(()) => Payload::ClientWriteResponse {
                    key: key.clone(),
                    value: value.clone(),
                },
                Err(e) => {
                    tracing::warn!("Write of '{}' failed: {}", key, e);
                    Payload::FailureIndication {
                        reason: e.to_string(),
                    }
                }
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::ClientDeleteRequest { key } => {
            let reply = match delete(node, key, true).await {
                Ok(()) => Payload::DeleteAcknowledgement { key: key.clone() },
                Err(e) => {
                    tracing::warn!("Delete of '{}' failed: {}", key, e);
                    Payload::FailureIndication {
                        reason: e.to_string(),
                    }
                }
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::Ping => {
            node.view.touch(msg.source_id);
            None
        }

        other => {
            tracing::warn!(
                "Coordinator received {}; dropping",
                other.type_name()
            );
            None
        }
    }
}

/// Admit a joining peer: assign the next id, record it, and defer the gossip
/// introduction until after the join reply has been sent.
fn admit(node: &mut Node, msg: &Message) -> Message {
    let new_id = node.view.next_id();
    node.view
        .insert(Peer::new(new_id, msg.source.clone(), PeerStatus::Node));

    tracing::info!(
        "Admitted peer {} at {}; ring size now {}",
        new_id,
        msg.source,
        node.view.ring_size()
    );

    node.defer_gossip(new_id);
    node.outbound(&msg.source, Payload::JoinResponse { new_id })
}

/// Write `value` under `key` on the current placement.
///
/// The write succeeds once at least one replica acknowledges; replicas that
/// time out are marked down and skipped, and a replica-side failure aborts
/// the whole write. On success the lookup table records the ring size the
/// placement was computed against.
pub async fn write(node: &Node, key: &str, value: &str) -> Result<(), NodeError> {
    let tables = node.tables()?;
    let ring_size = node.view.ring_size();
    let replicas = replica_peers(node, key, ring_size);
    if replicas.is_empty() {
        return Err(NodeError::ReplicaUnavailable(format!(
            "no data peers to write '{}'",
            key
        )));
    }

    let mut acknowledged = 0usize;
    for peer in &replicas {
        let request = node.outbound(
            &peer.address,
            Payload::WriteRequest {
                key: key.to_string(),
                value: value.to_string(),
            },
        );

        match node.transport.exchange(&peer.address, &request).await {
            Some(reply) => match reply.payload {
                Payload::WriteAcknowledgement { .. } => {
                    node.view.mark_up(peer.id);
                    acknowledged += 1;
                }
                Payload::FailureIndication { reason } => {
                    return Err(NodeError::StoreConflict(reason));
                }
                other => {
                    tracing::warn!(
                        "Peer {} answered write with {}",
                        peer.id,
                        other.type_name()
                    );
                }
            },
            None => node.view.mark_down(peer.id),
        }
    }

    if acknowledged == 0 {
        return Err(NodeError::ReplicaUnavailable(format!(
            "no replica acknowledged write of '{}'",
            key
        )));
    }

    tables.lookup.upsert(key, ring_size)?;
    tracing::debug!(
        "Wrote '{}' to {}/{} replicas at ring size {}",
        key,
        acknowledged,
        replicas.len(),
        ring_size
    );
    Ok(())
}

/// Read `key`, reconciling replica answers by last-writer-wins.
///
/// `stabilize_stale` re-shards the key first when its recorded ring size no
/// longer matches the current one (or a previous migration is still
/// journaled); Stabilize itself passes `false` to avoid recursing.
pub async fn read(node: &Node, key: &str, stabilize_stale: bool) -> Result<Record, NodeError> {
    let tables = node.tables()?;
    let Some(mut ring_old) = tables.lookup.get(key) else {
        return Err(NodeError::KeyNotFound(key.to_string()));
    };

    if stabilize_stale && (ring_old != node.view.ring_size() || tables.journal.contains(key)) {
        if let Err(e) = Box::pin(stabilize(node, key)).await {
            tracing::warn!("Stabilization of '{}' failed: {}", key, e);
        }
        ring_old = tables
            .lookup
            .get(key)
            .ok_or_else(|| NodeError::KeyNotFound(key.to_string()))?;
    }

    let replicas = replica_peers(node, key, ring_old);

    // First pass: who holds the key, and how fresh is it.
    let mut holders: Vec<(i64, u64)> = Vec::new();
    for peer in &replicas {
        let request = node.outbound(
            &peer.address,
            Payload::KeyRequest {
                key: key.to_string(),
            },
        );

        match node.transport.exchange(&peer.address, &request).await {
            Some(reply) => {
                if let Payload::KeyAcknowledgement { key: held, timestamp } = reply.payload {
                    node.view.mark_up(peer.id);
                    if !held.is_empty() {
                        holders.push((peer.id, timestamp));
                    }
                }
            }
            None => node.view.mark_down(peer.id),
        }
    }

    if holders.is_empty() {
        return Err(NodeError::KeyNotFound(key.to_string()));
    }

    // Greatest timestamp wins; ties fall to the lowest id.
    holders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    // Second pass: fetch the value from the winner, falling back along the
    // reconciliation order if the winner stops answering.
    for (peer_id, _) in &holders {
        let Some(peer) = replicas.iter().find(|p| p.id == *peer_id) else {
            continue;
        };
        let request = node.outbound(
            &peer.address,
            Payload::KeyQuery {
                key: key.to_string(),
            },
        );

        match node.transport.exchange(&peer.address, &request).await {
            Some(reply) => match reply.payload {
                Payload::ValueResponse {
                    key,
                    value,
                    timestamp,
                } => {
                    return Ok(Record {
                        key,
                        value,
                        timestamp,
                    })
                }
                other => {
                    tracing::warn!(
                        "Peer {} answered query with {}",
                        peer.id,
                        other.type_name()
                    );
                }
            },
            None => node.view.mark_down(peer.id),
        }
    }

    Err(NodeError::ReplicaUnavailable(format!(
        "no holder of '{}' answered the value query",
        key
    )))
}

/// Delete `key` from its recorded placement and drop the lookup entry.
///
/// Any replica-side failure aborts; timeouts mark the replica down and move
/// on, mirroring the write path.
pub async fn delete(node: &Node, key: &str, stabilize_stale: bool) -> Result<(), NodeError> {
    let tables = node.tables()?;
    let ring_now = node.view.ring_size();
    let mut ring_old = tables.lookup.get(key).unwrap_or(ring_now);

    if stabilize_stale && tables.lookup.get(key).is_some() && ring_old != ring_now {
        if let Err(e) = Box::pin(stabilize(node, key)).await {
            tracing::warn!("Stabilization of '{}' failed: {}", key, e);
        }
        ring_old = tables.lookup.get(key).unwrap_or(ring_now);
    }

    let replicas = replica_peers(node, key, ring_old);
    for peer in &replicas {
        let request = node.outbound(
            &peer.address,
            Payload::DeleteRequest {
                key: key.to_string(),
            },
        );

        match node.transport.exchange(&peer.address, &request).await {
            Some(reply) => match reply.payload {
                Payload::DeleteAcknowledgement { .. } => node.view.mark_up(peer.id),
                Payload::FailureIndication { reason } => {
                    return Err(NodeError::KeyNotFound(reason));
                }
                other => {
                    tracing::warn!(
                        "Peer {} answered delete with {}",
                        peer.id,
                        other.type_name()
                    );
                }
            },
            None => node.view.mark_down(peer.id),
        }
    }

    tables.lookup.remove(key)?;
    Ok(())
}

/// Re-shard one key after the ring size changed: read it from the old
/// placement, delete it there, and write it back on the current placement.
///
/// The key stays journaled for the whole migration; a failure in any step
/// leaves the journal entry so a later read re-attempts the move.
pub async fn stabilize(node: &Node, key: &str) -> Result<(), NodeError> {
    let tables = node.tables()?;
    let ring_old = tables.lookup.get(key).unwrap_or_else(|| node.view.ring_size());
    tables.journal.begin(key, ring_old)?;

    tracing::info!(
        "Stabilizing '{}': ring size {} -> {}",
        key,
        ring_old,
        node.view.ring_size()
    );

    let record = read(node, key, false)
        .await
        .map_err(|e| NodeError::StabilizationFailure(format!("read step for '{}': {}", key, e)))?;

    delete(node, key, false)
        .await
        .map_err(|e| NodeError::StabilizationFailure(format!("delete step for '{}': {}", key, e)))?;

    write(node, key, &record.value)
        .await
        .map_err(|e| NodeError::StabilizationFailure(format!("write step for '{}': {}", key, e)))?;

    tables.journal.complete(key)?;
    Ok(())
}

/// Re-attempt every migration the journal still holds. Runs at startup so a
/// coordinator restart finishes what it was doing.
pub async fn replay_journal(node: &Node) {
    let Ok(tables) = node.tables() else { return };
    for (key, from_ring) in tables.journal.pending() {
        tracing::info!(
            "Replaying pending stabilization of '{}' (from ring size {})",
            key,
            from_ring
        );
        if let Err(e) = stabilize(node, &key).await {
            tracing::warn!("Pending stabilization of '{}' still failing: {}", key, e);
        }
    }
}

/// The replica peers for `key` on a ring of `ring_size`, in placement order.
///
/// Indices point into the sorted-by-id data peers; ids are assigned
/// monotonically, so the first `ring_size` entries are exactly the members
/// of the ring the size refers to.
pub fn replica_peers(node: &Node, key: &str, ring_size: usize) -> Vec<Peer> {
    let sorted = node.view.data_peers_sorted();
    replicas_for(key, ring_size, node.config.replication_factor)
        .into_iter()
        .filter_map(|idx| sorted.get(idx).cloned())
        .collect()
}
