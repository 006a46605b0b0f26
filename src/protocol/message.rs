use crate::membership::types::Peer;

/// One message between peers: the fixed envelope plus a typed payload.
///
/// `network` carries the sender's piggybacked membership snapshot; `None`
/// encodes as `NODE-COUNT:-1` ("no network info").
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Sender address.
    pub source: String,
    /// Receiver address.
    pub destination: String,
    /// Sender's peer id (-1 for clients).
    pub source_id: i64,
    /// Piggybacked peer blocks, if any.
    pub network: Option<Vec<Peer>>,
    pub payload: Payload,
}

impl Message {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        source_id: i64,
        payload: Payload,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            source_id,
            network: None,
            payload,
        }
    }

    pub fn with_network(mut self, network: Vec<Peer>) -> Self {
        self.network = Some(network);
        self
    }
}

/// The type-specific portion of a message.
///
/// `Empty` is the reification of a transport timeout; it never crosses the
/// wire and the codec refuses to encode it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ClientReadRequest { key: String },
    ClientReadResponse { key: String, value: String, timestamp: u64 },
    ClientWriteRequest { key: String, value: String },
    ClientWriteResponse { key: String, value: String },
    ClientDeleteRequest { key: String },

    /// Coordinator asking a replica whether it holds a key.
    KeyRequest { key: String },
    /// Replica's answer; an empty `key` signals absence and `timestamp` 0.
    KeyAcknowledgement { key: String, timestamp: u64 },
    /// Coordinator fetching the value from the reconciled winner.
    KeyQuery { key: String },
    ValueResponse { key: String, value: String, timestamp: u64 },

    WriteRequest { key: String, value: String },
    WriteAcknowledgement { key: String },
    DeleteRequest { key: String },
    DeleteAcknowledgement { key: String },

    Ping,
    JoinRequest,
    JoinResponse { new_id: i64 },
    /// Gossip introduction of a newly admitted peer. The hop count is
    /// carried explicitly so dissemination is bounded on the wire.
    JoinIntroduction { new_id: i64, hop_count: u32 },

    FailureIndication { reason: String },

    /// Internal "no message this tick" sentinel for timed-out listens.
    /// Never serialized; the transport surfaces it as `None`.
    Empty,
}

impl Payload {
    /// The `TYPE` header value for this payload.
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::ClientReadRequest { .. } => "CLIENT-READ-REQUEST",
            Payload::ClientReadResponse { .. } => "CLIENT-READ-RESPONSE",
            Payload::ClientWriteRequest { .. } => "CLIENT-WRITE-REQUEST",
            Payload::ClientWriteResponse { .. } => "CLIENT-WRITE-RESPONSE",
            Payload::ClientDeleteRequest { .. } => "CLIENT-DELETE-REQUEST",
            Payload::KeyRequest { .. } => "KEY-REQUEST",
            Payload::KeyAcknowledgement { .. } => "KEY-ACKNOWLEDGEMENT",
            Payload::KeyQuery { .. } => "KEY-QUERY",
            Payload::ValueResponse { .. } => "VALUE-RESPONSE",
            Payload::WriteRequest { .. } => "WRITE-REQUEST",
            Payload::WriteAcknowledgement { .. } => "WRITE-ACKNOWLEDGEMENT",
            Payload::DeleteRequest { .. } => "DELETE-REQUEST",
            Payload::DeleteAcknowledgement { .. } => "DELETE-ACKNOWLEDGEMENT",
            Payload::Ping => "PING",
            Payload::JoinRequest => "JOIN-REQUEST",
            Payload::JoinResponse { .. } => "JOIN-RESPONSE",
            Payload::JoinIntroduction { .. } => "JOIN-INTRODUCTION",
            Payload::FailureIndication { .. } => "FAILURE-INDICATION",
            Payload::Empty => "EMPTY",
        }
    }
}
