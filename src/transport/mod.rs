//! Transport Module
//!
//! One TCP connection per exchange: the sender connects, writes a single
//! encoded message, half-closes, and reads at most one reply until EOF. The
//! receiver accepts, reads the message, and may write one response on the
//! same stream before closing.
//!
//! Every operation is bounded by the configured network timeout. A timeout
//! is not an error: it yields `None`, the "no data" outcome the dispatch
//! loop treats as an idle tick and orchestration code treats as a downed
//! peer.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::NodeError;
use crate::protocol::{decode, encode, Message};

/// Outbound side: sends messages to peer addresses.
#[derive(Debug, Clone)]
pub struct Transport {
    default_port: u16,
    timeout: Duration,
}

impl Transport {
    pub fn new(default_port: u16, timeout: Duration) -> Self {
        Self {
            default_port,
            timeout,
        }
    }

    /// Send `msg` and wait for the single reply. `None` on timeout, refused
    /// connection, or an unparseable reply; the caller decides whether that
    /// marks the peer down.
    pub async fn exchange(&self, address: &str, msg: &Message) -> Option<Message> {
        let text = match encode(msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Cannot encode outbound {}: {}", msg.payload.type_name(), e);
                return None;
            }
        };
        let target = self.target(address);

        let reply_text = match timeout(self.timeout, round_trip(&target, text)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::debug!("Exchange with {} failed: {}", target, e);
                return None;
            }
            Err(_) => {
                tracing::debug!("Exchange with {} timed out", target);
                return None;
            }
        };

        if reply_text.trim().is_empty() {
            return None;
        }

        match decode(&reply_text) {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!("Dropping unparseable reply from {}: {}", target, e);
                None
            }
        }
    }

    /// Send `msg` without waiting for a reply (gossip, pings). Returns
    /// whether the bytes were written in time.
    pub async fn send(&self, address: &str, msg: &Message) -> bool {
        let text = match encode(msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Cannot encode outbound {}: {}", msg.payload.type_name(), e);
                return false;
            }
        };
        let target = self.target(address);

        match timeout(self.timeout, fire(&target, text)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("Send to {} failed: {}", target, e);
                false
            }
            Err(_) => {
                tracing::debug!("Send to {} timed out", target);
                false
            }
        }
    }

    /// A bare IPv4 address connects on the configured port; an explicit
    /// `ip:port` form connects as-is.
    fn target(&self, address: &str) -> String {
        if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, self.default_port)
        }
    }
}

async fn round_trip(target: &str, text: String) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(target).await?;
    stream.write_all(text.as_bytes()).await?;
    stream.shutdown().await?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;
    Ok(reply)
}

async fn fire(target: &str, text: String) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(target).await?;
    stream.write_all(text.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Inbound side: the peer's bound listen socket.
pub struct Listener {
    inner: TcpListener,
    timeout: Duration,
}

impl Listener {
    pub async fn bind(bind_addr: &str, timeout: Duration) -> std::io::Result<Self> {
        let inner = TcpListener::bind(bind_addr).await?;
        Ok(Self { inner, timeout })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// One bound listen cycle: accept and read a single message.
    ///
    /// `None` covers both the idle tick (nothing arrived in time) and a
    /// rejected inbound record: a message that cannot be decoded is logged
    /// and dropped without touching any state.
    pub async fn poll(&self) -> Option<Inbound> {
        let (mut stream, remote) = match timeout(self.timeout, self.inner.accept()).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => {
                tracing::warn!("Accept failed: {}", e);
                return None;
            }
            Err(_) => return None,
        };

        let mut text = String::new();
        match timeout(self.timeout, stream.read_to_string(&mut text)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!("Read from {} failed: {}", remote, e);
                return None;
            }
            Err(_) => {
                tracing::warn!("Read from {} timed out", remote);
                return None;
            }
        }

        match decode(&text) {
            Ok(message) => Some(Inbound { message, stream }),
            Err(e) => {
                tracing::warn!("Dropping malformed message from {}: {}", remote, e);
                None
            }
        }
    }
}

/// An accepted message plus the stream to answer on.
pub struct Inbound {
    pub message: Message,
    stream: TcpStream,
}

impl Inbound {
    /// Write the single response for this exchange.
    pub async fn reply(mut self, msg: &Message) -> Result<(), NodeError> {
        let text = encode(msg)?;
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Payload;

    fn short() -> Duration {
        Duration::from_millis(500)
    }

    #[tokio::test]
    async fn test_exchange_round_trip() {
        let listener = Listener::bind("127.0.0.1:0", short()).await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let inbound = listener.poll().await.expect("no message");
            let request = inbound.message.clone();
            let reply = Message::new(
                request.destination.clone(),
                request.source.clone(),
                2,
                Payload::WriteAcknowledgement {
                    key: "A".to_string(),
                },
            );
            inbound.reply(&reply).await.unwrap();
            request
        });

        let transport = Transport::new(0, short());
        let request = Message::new(
            "127.0.0.1",
            addr.clone(),
            0,
            Payload::WriteRequest {
                key: "A".to_string(),
                value: "hello".to_string(),
            },
        );

        let reply = transport.exchange(&addr, &request).await.expect("no reply");
        assert_eq!(
            reply.payload,
            Payload::WriteAcknowledgement {
                key: "A".to_string()
            }
        );

        let seen = server.await.unwrap();
        assert_eq!(seen.payload, request.payload);
    }

    #[tokio::test]
    async fn test_exchange_against_dead_peer_yields_none() {
        // Bind then drop, so the port is very likely unoccupied.
        let probe = Listener::bind("127.0.0.1:0", short()).await.unwrap();
        let addr = probe.local_addr().unwrap().to_string();
        drop(probe);

        let transport = Transport::new(0, short());
        let msg = Message::new("127.0.0.1", addr.clone(), 0, Payload::Ping);
        assert!(transport.exchange(&addr, &msg).await.is_none());
    }

    #[tokio::test]
    async fn test_poll_times_out_quietly() {
        let listener = Listener::bind("127.0.0.1:0", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(listener.poll().await.is_none());
    }

    #[tokio::test]
    async fn test_poll_drops_malformed_input() {
        let listener = Listener::bind("127.0.0.1:0", short()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"not a protocol line\n").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        assert!(listener.poll().await.is_none());
    }

    #[tokio::test]
    async fn test_send_one_way() {
        let listener = Listener::bind("127.0.0.1:0", short()).await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move { listener.poll().await.map(|i| i.message) });

        let transport = Transport::new(0, short());
        let msg = Message::new("127.0.0.1", addr.clone(), 0, Payload::Ping);
        assert!(transport.send(&addr, &msg).await);

        let seen = server.await.unwrap().expect("no message");
        assert_eq!(seen.payload, Payload::Ping);
    }

    #[tokio::test]
    async fn test_bare_address_gets_default_port() {
        let transport = Transport::new(9321, short());
        assert_eq!(transport.target("10.0.0.1"), "10.0.0.1:9321");
        assert_eq!(transport.target("10.0.0.1:80"), "10.0.0.1:80");
    }
}
