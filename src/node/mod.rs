//! Node State Machine Module
//!
//! A peer runs in one of three roles fixed at construction. The role selects
//! the handler inside a single dispatch entry point; there is no trait
//! hierarchy behind it.
//!
//! - **Coordinator** (`coordinator`): admits joining peers, orchestrates
//!   client reads, writes and deletes over the replicas, and re-shards keys
//!   when the ring size changes.
//! - **Node** (`replica`): serves write/delete/read probes against its local
//!   record table and relays gossip introductions.
//! - **Client** (`client`): issues request/response round trips against the
//!   Coordinator; it never serves.
//!
//! The dispatch loop owns the membership view and the store handles. It
//! processes one inbound message to completion before accepting the next, so
//! there are no intra-peer races on the view or the lookup table.

pub mod client;
pub mod coordinator;
pub mod gossip;
pub mod replica;


use crate::config::Config;
use crate::error::NodeError;
use crate::membership::types::{Peer, PeerStatus, CLIENT_ID, COORDINATOR_ID};
use crate::membership::view::MembershipView;
use crate::protocol::{Message, Payload};
use crate::storage::journal::StabilizeJournal;
use crate::storage::store::{LookupTable, RecordTable};
use crate::transport::{Inbound, Listener, Transport};

/// The role a peer was constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Node,
    Client,
}

/// Lifecycle of a peer. Every role starts in `Starting`; the only terminal
/// transition is external shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Joined,
}

/// Tables only the Coordinator owns.
pub struct CoordinatorTables {
    pub lookup: LookupTable,
    pub journal: StabilizeJournal,
}

/// A running peer: identity, view, stores, and the outbound transport.
pub struct Node {
    /// Peer id. Unassigned data nodes carry -1 until the Coordinator
    /// answers their join request.
    pub id: i64,
    pub role: Role,
    pub address: String,
    pub coordinator_address: String,
    pub state: LifecycleState,
    pub view: MembershipView,
    pub records: RecordTable,
    pub transport: Transport,
    pub config: Config,
    tables: Option<CoordinatorTables>,
    pending_gossip: Option<i64>,
}

impl Node {
    /// Build the Coordinator peer. It is joined immediately and its view
    /// starts with its own record.
    pub fn coordinator(address: impl Into<String>, config: Config) -> Result<Self, NodeError> {
        let address = address.into();
        let records = RecordTable::open(&config.data_dir)?;
        let lookup = LookupTable::open(&config.data_dir)?;
        let journal = StabilizeJournal::open(&config.data_dir)?;

        let view = MembershipView::new();
        view.insert(Peer::new(
            COORDINATOR_ID,
            address.clone(),
            PeerStatus::Coordinator,
        ));

        let transport = Transport::new(config.port, config.network_timeout());
        Ok(Self {
            id: COORDINATOR_ID,
            role: Role::Coordinator,
            coordinator_address: address.clone(),
            address,
            state: LifecycleState::Joined,
            view,
            records,
            transport,
            config,
            tables: Some(CoordinatorTables { lookup, journal }),
            pending_gossip: None,
        })
    }

    /// Build a data-bearing peer. It stays `Starting` until the join
    /// handshake assigns its id.
    pub fn data_node(
        address: impl Into<String>,
        coordinator_address: impl Into<String>,
        config: Config,
    ) -> Result<Self, NodeError> {
        let records = RecordTable::open(&config.data_dir)?;
        let transport = Transport::new(config.port, config.network_timeout());
        Ok(Self {
            id: CLIENT_ID,
            role: Role::Node,
            address: address.into(),
            coordinator_address: coordinator_address.into(),
            state: LifecycleState::Starting,
            view: MembershipView::new(),
            records,
            transport,
            config,
            tables: None,
            pending_gossip: None,
        })
    }

    /// The Coordinator's tables, or a protocol violation from any other role.
    pub fn tables(&self) -> Result<&CoordinatorTables, NodeError> {
        self.tables.as_ref().ok_or_else(|| {
            NodeError::ProtocolViolation("coordinator tables on a non-coordinator peer".to_string())
        })
    }

    /// An outbound message to `destination` with the piggybacked view
    /// attached. The snapshot omits clients and the destination host, and
    /// stamps this peer's own block with the current instant.
    pub fn outbound(&self, destination: &str, payload: Payload) -> Message {
        let network = self.view.snapshot_for(self.id, destination);
        Message::new(self.address.clone(), destination, self.id, payload).with_network(network)
    }

    /// Serve forever: join if needed, then dispatch one message at a time.
    pub async fn run(mut self, listener: Listener) -> Result<(), NodeError> {
        match self.role {
            Role::Coordinator => {
                tracing::info!(
                    "Coordinator listening on {} (ring size {})",
                    self.address,
                    self.view.ring_size()
                );
                coordinator::replay_journal(&self).await;
            }
            Role::Node => {
                self.join().await;
            }
            Role::Client => {
                return Err(NodeError::ProtocolViolation(
                    "clients issue requests; they do not run a dispatch loop".to_string(),
                ))
            }
        }

        loop {
            if let Some(inbound) = listener.poll().await {
                self.dispatch(inbound).await;
            }
        }
    }

    /// Join handshake for data nodes: keep asking the Coordinator until it
    /// answers with an id and a network snapshot.
    pub async fn join(&mut self) {
        loop {
            let request = Message::new(
                self.address.clone(),
                self.coordinator_address.clone(),
                self.id,
                Payload::JoinRequest,
            );

            match self
                .transport
                .exchange(&self.coordinator_address, &request)
                .await
            {
                Some(reply) => {
                    if let Payload::JoinResponse { new_id } = reply.payload {
                        self.id = new_id;
                        if let Some(peers) = &reply.network {
                            self.view.merge_all(peers.iter());
                        }
                        self.view.insert(Peer::new(
                            new_id,
                            self.address.clone(),
                            PeerStatus::Node,
                        ));
                        self.state = LifecycleState::Joined;
                        tracing::info!(
                            "Joined as peer {} (view holds {} peers)",
                            new_id,
                            self.view.len()
                        );
                        return;
                    }
                    tracing::warn!(
                        "Expected JoinResponse, got {}; retrying",
                        reply.payload.type_name()
                    );
                }
                None => {
                    tracing::warn!(
                        "Coordinator {} not answering join request; retrying",
                        self.coordinator_address
                    );
                }
            }

            tokio::time::sleep(self.config.network_timeout()).await;
        }
    }

    /// The single dispatch entry point. Merges any piggybacked network
    /// block, hands the message to the role's handler, sends the handler's
    /// reply on the inbound stream, then runs deferred gossip.
    pub async fn dispatch(&mut self, inbound: Inbound) {
        let msg = inbound.message.clone();
        tracing::debug!(
            "{} from {} (peer {})",
            msg.payload.type_name(),
            msg.source,
            msg.source_id
        );

        if let Some(peers) = &msg.network {
            self.view.merge_all(peers.iter());
        }

        let reply = match self.role {
            Role::Coordinator => coordinator::handle(self, &msg).await,
            Role::Node => replica::handle(self, &msg).await,
            Role::Client => {
                tracing::warn!(
                    "Client role received {}; dropping",
                    msg.payload.type_name()
                );
                None
            }
        };

        match reply {
            Some(reply) => {
                if let Err(e) = inbound.reply(&reply).await {
                    tracing::warn!("Failed to answer {}: {}", msg.source, e);
                }
            }
            None => drop(inbound),
        }

        if let Some(new_id) = self.pending_gossip.take() {
            gossip::initiate(self, new_id).await;
        }
    }

    pub(crate) fn defer_gossip(&mut self, new_id: i64) {
        self.pending_gossip = Some(new_id);
    }
}
