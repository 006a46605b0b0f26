//! Client role: request/response round trips against the Coordinator.
//!
//! A client never listens and never appears in piggybacked network blocks.
//! Each operation is one bounded exchange; a missing or failed answer
//! surfaces as an error the CLI prints.

use crate::config::Config;
use crate::error::NodeError;
use crate::membership::types::CLIENT_ID;
use crate::protocol::{Message, Payload};
use crate::storage::store::Record;
use crate::transport::Transport;

use super::LifecycleState;

pub struct Client {
    pub address: String,
    pub coordinator_address: String,
    pub state: LifecycleState,
    transport: Transport,
}

impl Client {
    /// A client is joined as soon as its Coordinator entry is configured.
    pub fn new(
        address: impl Into<String>,
        coordinator_address: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self {
            address: address.into(),
            coordinator_address: coordinator_address.into(),
            state: LifecycleState::Joined,
            transport: Transport::new(config.port, config.network_timeout()),
        }
    }

    pub async fn read(&self, key: &str) -> Result<Record, NodeError> {
        let reply = self
            .round_trip(Payload::ClientReadRequest {
                key: key.to_string(),
            })
            .await?;

        match reply {
            Payload::ClientReadResponse {
                key,
                value,
                timestamp,
            } => Ok(Record {
                key,
                value,
                timestamp,
            }),
            Payload::FailureIndication { reason } => Err(NodeError::KeyNotFound(reason)),
            other => Err(unexpected("read", &other)),
        }
    }

    pub async fn write(&self, key: &str, value: &str) -> Result<(), NodeError> {
        let reply = self
            .round_trip(Payload::ClientWriteRequest {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await?;

        match reply {
            Payload::ClientWriteResponse { .. } => Ok(()),
            Payload::FailureIndication { reason } => Err(NodeError::ReplicaUnavailable(reason)),
            other => Err(unexpected("write", &other)),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), NodeError> {
        let reply = self
            .round_trip(Payload::ClientDeleteRequest {
                key: key.to_string(),
            })
            .await?;

        match reply {
            Payload::DeleteAcknowledgement { .. } => Ok(()),
            Payload::FailureIndication { reason } => Err(NodeError::KeyNotFound(reason)),
            other => Err(unexpected("delete", &other)),
        }
    }

    async fn round_trip(&self, payload: Payload) -> Result<Payload, NodeError> {
        let request = Message::new(
            self.address.clone(),
            self.coordinator_address.clone(),
            CLIENT_ID,
            payload,
        );

        let reply = self
            .transport
            .exchange(&self.coordinator_address, &request)
            .await
            .ok_or_else(|| {
                NodeError::ReplicaUnavailable(format!(
                    "coordinator {} did not answer",
                    self.coordinator_address
                ))
            })?;

        Ok(reply.payload)
    }
}

fn unexpected(operation: &str, payload: &Payload) -> NodeError {
    NodeError::ProtocolViolation(format!(
        "coordinator answered {} with {}",
        operation,
        payload.type_name()
    ))
}
