//! Parent Registration Handshake
//!
//! Before a non-root node may serve traffic it must register itself with its
//! parent as a subdomain. The exchange is a single request and a single
//! acknowledgement, bounded by a fixed timeout. There is no retry: any
//! failure is fatal to the node.
//!
//! ```text
//!  Unregistered ──send REGISTER──▶ AwaitingAck ──ack(success)──▶ Registered
//!                                      │
//!                                      └──timeout / ack(failure)──▶ Failed
//! ```

use super::transport::{send_message, DatagramTransport};
use crate::error::{Error, Result};
use crate::protocol::{ChildKind, DomainName, Message, MessageCodec, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long to wait for the parent's acknowledgement
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Handshake progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Unregistered,
    AwaitingAck,
    Registered,
    /// Terminal; carries the diagnostic
    Failed(String),
}

/// Drives a node's registration with its parent
#[derive(Debug)]
pub struct RegistrationClient {
    domain: DomainName,
    parent: Option<SocketAddr>,
    timeout: Duration,
    state: HandshakeState,
}

impl RegistrationClient {
    /// Create a client; a node without a parent starts out registered
    pub fn new(domain: DomainName, parent: Option<SocketAddr>, timeout: Duration) -> Self {
        let state = if parent.is_some() {
            HandshakeState::Unregistered
        } else {
            HandshakeState::Registered
        };

        Self {
            domain,
            parent,
            timeout,
            state,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state == HandshakeState::Registered
    }

    /// Run the handshake to completion over `transport`.
    ///
    /// Blocks the caller until the parent acknowledges, rejects, or the
    /// timeout elapses. Datagrams from anyone other than the parent, and
    /// anything that is not a registration result, are dropped meanwhile.
    pub async fn register<T>(&mut self, transport: &T) -> Result<()>
    where
        T: DatagramTransport + ?Sized,
    {
        let parent = match (&self.state, self.parent) {
            (HandshakeState::Registered, _) => return Ok(()),
            (HandshakeState::Unregistered, Some(parent)) => parent,
            (state, _) => {
                return Err(Error::HandshakeProtocol(format!(
                    "cannot start handshake from state {:?}",
                    state
                )))
            }
        };

        let result = self.exchange(transport, parent).await;
        match &result {
            Ok(()) => {
                info!(domain = %self.domain, %parent, "Registered with parent");
                self.state = HandshakeState::Registered;
            }
            Err(e) => {
                warn!(domain = %self.domain, %parent, error = %e, "Registration with parent failed");
                self.state = HandshakeState::Failed(e.to_string());
            }
        }
        result
    }

    async fn exchange<T>(&mut self, transport: &T, parent: SocketAddr) -> Result<()>
    where
        T: DatagramTransport + ?Sized,
    {
        let name = self.domain.leaf_label().ok_or_else(|| {
            Error::HandshakeProtocol("the root domain has no parent to register with".to_string())
        })?;

        let request = Message::register(ChildKind::Subdomain, name);
        send_message(transport, &request, parent).await?;
        self.state = HandshakeState::AwaitingAck;
        debug!(domain = %self.domain, %parent, "Registration sent, awaiting acknowledgement");

        match tokio::time::timeout(self.timeout, await_ack(transport, parent)).await {
            Ok(result) => result,
            Err(_) => Err(Error::HandshakeTimeout {
                parent,
                timeout: self.timeout,
            }),
        }
    }
}

async fn await_ack<T>(transport: &T, parent: SocketAddr) -> Result<()>
where
    T: DatagramTransport + ?Sized,
{
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, from) = transport.recv_from(&mut buf).await?;
        if from != parent {
            debug!(%from, "Ignoring datagram from non-parent during handshake");
            continue;
        }

        match MessageCodec::decode(&buf[..len]) {
            Ok(Message::RegisterResult { success: true, .. }) => return Ok(()),
            Ok(Message::RegisterResult {
                success: false,
                error_text,
            }) => {
                return Err(Error::HandshakeRejected {
                    parent,
                    reason: error_text.unwrap_or_else(|| "no reason given".to_string()),
                })
            }
            Ok(other) => debug!(kind = other.kind(), "Ignoring unexpected message during handshake"),
            Err(e) => warn!(error = %e, "Dropping malformed reply from parent"),
        }
    }
}
