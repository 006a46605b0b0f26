//! Handlers for the data-bearing role.
//!
//! A replica answers the Coordinator's probes against its local record
//! table and relays gossip introductions. It never orchestrates: placement
//! decisions and reconciliation belong to the Coordinator.

use crate::protocol::{Message, Payload};

use super::{gossip, Node};

/// Dispatch one message for the Node role. Returns the reply to send on the
/// inbound stream, or `None` for respond-only message kinds.
pub async fn handle(node: &mut Node, msg: &Message) -> Option<Message> {
    match &msg.payload {
        Payload::WriteRequest { key, value } => {
            let reply = match node.records.upsert(key, value) {
                Ok(stamp) => {
                    tracing::debug!("Stored '{}' at {}", key, stamp);
                    Payload::WriteAcknowledgement { key: key.clone() }
                }
                Err(e) => {
                    tracing::warn!("Write of '{}' rejected: {}", key, e);
                    Payload::FailureIndication {
                        reason: e.to_string(),
                    }
                }
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::DeleteRequest { key } => {
            let reply = match node.records.remove(key) {
                Ok(_) => Payload::DeleteAcknowledgement { key: key.clone() },
                Err(e) => Payload::FailureIndication {
                    reason: e.to_string(),
                },
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::KeyRequest { key } => {
            // An empty key in the acknowledgement signals absence.
            let reply = match node.records.get(key) {
                Some(record) => Payload::KeyAcknowledgement {
                    key: record.key,
                    timestamp: record.timestamp,
                },
                None => Payload::KeyAcknowledgement {
                    key: String::new(),
                    timestamp: 0,
                },
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::KeyQuery { key } => {
            let reply = match node.records.get(key) {
                Some(record) => Payload::ValueResponse {
                    key: record.key,
                    value: record.value,
                    timestamp: record.timestamp,
                },
                None => Payload::FailureIndication {
                    reason: format!("key not found: {}", key),
                },
            };
            Some(node.outbound(&msg.source, reply))
        }

        Payload::JoinIntroduction { new_id, hop_count } => {
            // The introduction's network block was merged during dispatch;
            // all that is left is the relay decision.
            gossip::relay(node, *new_id, *hop_count).await;
            None
        }

        Payload::Ping => {
            node.view.touch(msg.source_id);
            None
        }

        other => {
            tracing::warn!(
                "Node role cannot handle {}; dropping",
                other.type_name()
            );
            None
        }
    }
}
