use crate::error::NodeError;
use crate::membership::types::{Peer, PeerStatus};

use super::message::{Message, Payload};

/// Serialize a message to its wire text.
///
/// Field order is fixed: the five header lines, the peer blocks when a
/// network snapshot is attached, then the type-specific fields.
pub fn encode(msg: &Message) -> Result<String, NodeError> {
    if matches!(msg.payload, Payload::Empty) {
        return Err(NodeError::MalformedMessage(
            "the Empty sentinel is internal and cannot be serialized".to_string(),
        ));
    }

    let mut out = String::new();
    push_field(&mut out, "SOURCE", &msg.source);
    push_field(&mut out, "DESTINATION", &msg.destination);
    push_field(&mut out, "TYPE", msg.payload.type_name());
    push_field(&mut out, "SOURCE-ID", &msg.source_id.to_string());

    match &msg.network {
        Some(peers) => {
            push_field(&mut out, "NODE-COUNT", &peers.len().to_string());
            for peer in peers {
                push_field(&mut out, "ID", &peer.id.to_string());
                push_field(&mut out, "STATUS", peer.status.as_wire());
                push_field(&mut out, "ADDRESS", &peer.address);
                push_field(&mut out, "IS-DOWN", if peer.is_down { "1" } else { "0" });
                push_field(&mut out, "LAST-UPDATED", &peer.last_updated.to_string());
            }
        }
        None => push_field(&mut out, "NODE-COUNT", "-1"),
    }

    match &msg.payload {
        Payload::ClientReadRequest { key }
        | Payload::ClientDeleteRequest { key }
        | Payload::KeyRequest { key }
        | Payload::KeyQuery { key }
        | Payload::WriteAcknowledgement { key }
        | Payload::DeleteRequest { key }
        | Payload::DeleteAcknowledgement { key } => {
            push_field(&mut out, "KEY", key);
        }
        Payload::ClientReadResponse { key, value, timestamp }
        | Payload::ValueResponse { key, value, timestamp } => {
            push_field(&mut out, "KEY", key);
            push_field(&mut out, "VALUE", value);
            push_field(&mut out, "TIMESTAMP", &timestamp.to_string());
        }
        Payload::ClientWriteRequest { key, value }
        | Payload::ClientWriteResponse { key, value }
        | Payload::WriteRequest { key, value } => {
            push_field(&mut out, "KEY", key);
            push_field(&mut out, "VALUE", value);
        }
        Payload::KeyAcknowledgement { key, timestamp } => {
            push_field(&mut out, "KEY", key);
            push_field(&mut out, "TIMESTAMP", &timestamp.to_string());
        }
        Payload::JoinResponse { new_id } => {
            push_field(&mut out, "NEW-ID", &new_id.to_string());
        }
        Payload::JoinIntroduction { new_id, hop_count } => {
            push_field(&mut out, "NEW-ID", &new_id.to_string());
            push_field(&mut out, "HOP-COUNT", &hop_count.to_string());
        }
        Payload::FailureIndication { reason } => {
            push_field(&mut out, "FAILED", reason);
        }
        Payload::Ping | Payload::JoinRequest => {}
        Payload::Empty => unreachable!(),
    }

    Ok(out)
}

/// Parse wire text back into a message.
pub fn decode(text: &str) -> Result<Message, NodeError> {
    let mut lines = text.lines();

    let source = expect_field(&mut lines, "SOURCE")?;
    let destination = expect_field(&mut lines, "DESTINATION")?;
    let type_name = expect_field(&mut lines, "TYPE")?;
    let source_id = parse_i64(&expect_field(&mut lines, "SOURCE-ID")?, "SOURCE-ID")?;
    let node_count = parse_i64(&expect_field(&mut lines, "NODE-COUNT")?, "NODE-COUNT")?;

    let network = if node_count >= 0 {
        // Sized by pushes, not by the header: NODE-COUNT is unvalidated
        // input and a truncated block errors out below anyway.
        let mut peers = Vec::new();
        for _ in 0..node_count {
            peers.push(decode_peer_block(&mut lines)?);
        }
        Some(peers)
    } else {
        None
    };

    let payload = decode_payload(&type_name, &mut lines)?;

    Ok(Message {
        source,
        destination,
        source_id,
        network,
        payload,
    })
}

fn decode_peer_block<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<Peer, NodeError> {
    let id = parse_i64(&expect_field(lines, "ID")?, "ID")?;
    let status_text = expect_field(lines, "STATUS")?;
    let status = PeerStatus::from_wire(&status_text).ok_or_else(|| {
        NodeError::MalformedMessage(format!("unknown peer status '{}'", status_text))
    })?;
    let address = expect_field(lines, "ADDRESS")?;
    let is_down = match expect_field(lines, "IS-DOWN")?.as_str() {
        "0" => false,
        "1" => true,
        other => {
            return Err(NodeError::MalformedMessage(format!(
                "IS-DOWN must be 0 or 1, got '{}'",
                other
            )))
        }
    };
    let last_updated = parse_u64(&expect_field(lines, "LAST-UPDATED")?, "LAST-UPDATED")?;

    Ok(Peer {
        id,
        address,
        status,
        is_down,
        last_updated,
    })
}

fn decode_payload<'a>(
    type_name: &str,
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<Payload, NodeError> {
    let payload = match type_name {
        "CLIENT-READ-REQUEST" => Payload::ClientReadRequest {
            key: expect_field(lines, "KEY")?,
        },
        "CLIENT-READ-RESPONSE" => Payload::ClientReadResponse {
            key: expect_field(lines, "KEY")?,
            value: expect_field(lines, "VALUE")?,
            timestamp: parse_u64(&expect_field(lines, "TIMESTAMP")?, "TIMESTAMP")?,
        },
        "CLIENT-WRITE-REQUEST" => Payload::ClientWriteRequest {
            key: expect_field(lines, "KEY")?,
            value: expect_field(lines, "VALUE")?,
        },
        "CLIENT-WRITE-RESPONSE" => Payload::ClientWriteResponse {
            key: expect_field(lines, "KEY")?,
            value: expect_field(lines, "VALUE")?,
        },
        "CLIENT-DELETE-REQUEST" => Payload::ClientDeleteRequest {
            key: expect_field(lines, "KEY")?,
        },
        "KEY-REQUEST" => Payload::KeyRequest {
            key: expect_field(lines, "KEY")?,
        },
        "KEY-ACKNOWLEDGEMENT" => Payload::KeyAcknowledgement {
            key: expect_field(lines, "KEY")?,
            timestamp: parse_u64(&expect_field(lines, "TIMESTAMP")?, "TIMESTAMP")?,
        },
        "KEY-QUERY" => Payload::KeyQuery {
            key: expect_field(lines, "KEY")?,
        },
        "VALUE-RESPONSE" => Payload::ValueResponse {
            key: expect_field(lines, "KEY")?,
            value: expect_field(lines, "VALUE")?,
            timestamp: parse_u64(&expect_field(lines, "TIMESTAMP")?, "TIMESTAMP")?,
        },
        "WRITE-REQUEST" => Payload::WriteRequest {
            key: expect_field(lines, "KEY")?,
            value: expect_field(lines, "VALUE")?,
        },
        "WRITE-ACKNOWLEDGEMENT" => Payload::WriteAcknowledgement {
            key: expect_field(lines, "KEY")?,
        },
        "DELETE-REQUEST" => Payload::DeleteRequest {
            key: expect_field(lines, "KEY")?,
        },
        "DELETE-ACKNOWLEDGEMENT" => Payload::DeleteAcknowledgement {
            key: expect_field(lines, "KEY")?,
        },
        "PING" => Payload::Ping,
        "JOIN-REQUEST" => Payload::JoinRequest,
        "JOIN-RESPONSE" => Payload::JoinResponse {
            new_id: parse_i64(&expect_field(lines, "NEW-ID")?, "NEW-ID")?,
        },
        "JOIN-INTRODUCTION" => Payload::JoinIntroduction {
            new_id: parse_i64(&expect_field(lines, "NEW-ID")?, "NEW-ID")?,
            hop_count: parse_u64(&expect_field(lines, "HOP-COUNT")?, "HOP-COUNT")? as u32,
        },
        "FAILURE-INDICATION" => Payload::FailureIndication {
            reason: expect_field(lines, "FAILED")?,
        },
        other => {
            return Err(NodeError::MalformedMessage(format!(
                "unknown message type '{}'",
                other
            )))
        }
    };

    Ok(payload)
}

fn push_field(out: &mut String, field: &str, value: &str) {
    out.push_str(field);
    out.push(':');
    out.push_str(value);
    out.push('\n');
}

/// Read the next line and require it to carry `field`. The separator is the
/// first `:`; both halves are trimmed.
fn expect_field<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    field: &str,
) -> Result<String, NodeError> {
    let line = lines
        .next()
        .ok_or_else(|| NodeError::MalformedMessage(format!("missing {} line", field)))?;

    let (name, value) = line.split_once(':').ok_or_else(|| {
        NodeError::MalformedMessage(format!("expected {}:<value>, got '{}'", field, line))
    })?;

    if name.trim() != field {
        return Err(NodeError::MalformedMessage(format!(
            "expected field {}, got '{}'",
            field,
            name.trim()
        )));
    }

    Ok(value.trim().to_string())
}

fn parse_i64(value: &str, field: &str) -> Result<i64, NodeError> {
    value
        .parse::<i64>()
        .map_err(|_| NodeError::MalformedMessage(format!("{} is not an integer: '{}'", field, value)))
}

fn parse_u64(value: &str, field: &str) -> Result<u64, NodeError> {
    value
        .parse::<u64>()
        .map_err(|_| NodeError::MalformedMessage(format!("{} is not an integer: '{}'", field, value)))
}
