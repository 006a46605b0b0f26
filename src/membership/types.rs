use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reserved id of the single Coordinator peer.
pub const COORDINATOR_ID: i64 = 0;
/// Reserved id used by clients, which never bear data.
pub const CLIENT_ID: i64 = -1;

/// The role a peer plays in the cluster.
///
/// The status travels on the wire inside piggybacked peer blocks, so the
/// string forms are part of the protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeerStatus {
    /// The single peer with id 0 that mediates all client operations.
    Coordinator,
    /// A data-bearing peer holding replicas.
    Node,
    /// A request-issuing peer; excluded from piggybacked network blocks.
    Client,
}

impl PeerStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            PeerStatus::Coordinator => "COORDINATOR",
            PeerStatus::Node => "NODE",
            PeerStatus::Client => "CLIENT",
        }
    }

    pub fn from_wire(text: &str) -> Option<Self> {
        match text {
            "COORDINATOR" => Some(PeerStatus::Coordinator),
            "NODE" => Some(PeerStatus::Node),
            "CLIENT" => Some(PeerStatus::Client),
            _ => None,
        }
    }
}

/// A single member of the cluster as known to some peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    /// Numeric identity. 0 = Coordinator, -1 = Client, positive = data node.
    pub id: i64,
    /// IPv4 address, optionally with an explicit `:port` suffix.
    pub address: String,
    pub status: PeerStatus,
    /// Set when an expected response from this peer failed to arrive in time.
    pub is_down: bool,
    /// Unix seconds of the freshest information about this peer. Governs the
    /// merge rule: higher stamps win.
    pub last_updated: u64,
}

impl Peer {
    pub fn new(id: i64, address: impl Into<String>, status: PeerStatus) -> Self {
        Self {
            id,
            address: address.into(),
            status,
            is_down: false,
            last_updated: now_seconds(),
        }
    }

    /// Whether this peer participates in the ring.
    pub fn is_data_bearing(&self) -> bool {
        self.id > 0
    }
}

pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
