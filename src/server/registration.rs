//! Registration Server
//!
//! Accepts registration requests from children (hosts and subdomain
//! servers), records them in the registry and acknowledges them. Each
//! request is handled as its own task so that the event loop never waits on
//! one.

use super::transport::{send_message, DatagramTransport};
use crate::error::{Error, Result};
use crate::protocol::{ChildKind, Message};
use crate::registry::RegistryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Reply text sent when the name is already taken
pub const CONFLICT_TEXT: &str = "name already registered";

/// What happened to one registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub kind: ChildKind,
    pub name: String,
    pub endpoint: SocketAddr,
    /// The reply sent back to the child
    pub reply: Message,
}

impl RegistrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.reply, Message::RegisterResult { success: true, .. })
    }
}

/// Handles inbound `REGISTER` messages
#[derive(Clone)]
pub struct RegistrationServer {
    registry: Arc<RegistryStore>,
    transport: Arc<dyn DatagramTransport>,
}

impl RegistrationServer {
    pub fn new(registry: Arc<RegistryStore>, transport: Arc<dyn DatagramTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Apply a registration to the registry and build the reply
    pub fn apply(&self, kind: ChildKind, name: &str, endpoint: SocketAddr) -> Message {
        match self.registry.register(kind, name, endpoint) {
            Ok(_) => Message::registered(),
            Err(Error::RegistrationConflict { .. }) => Message::rejected(CONFLICT_TEXT),
            Err(Error::InvalidName { reason, .. }) => {
                Message::rejected(format!("invalid name: {}", reason))
            }
            Err(e) => Message::rejected(e.to_string()),
        }
    }

    /// Register a child and send the acknowledgement to it
    pub async fn handle(
        &self,
        kind: ChildKind,
        name: String,
        endpoint: SocketAddr,
    ) -> Result<RegistrationOutcome> {
        let reply = self.apply(kind, &name, endpoint);
        let outcome = RegistrationOutcome {
            kind,
            name,
            endpoint,
            reply,
        };

        // The registry has already changed; record that even if the ack is lost
        if outcome.is_success() {
            info!(
                kind = %outcome.kind,
                name = %outcome.name,
                endpoint = %outcome.endpoint,
                "New {} registered", outcome.kind
            );
        } else {
            warn!(
                kind = %outcome.kind,
                name = %outcome.name,
                endpoint = %outcome.endpoint,
                reply = ?outcome.reply,
                "Registration refused"
            );
        }

        if let Err(e) = send_message(self.transport.as_ref(), &outcome.reply, endpoint).await {
            warn!(
                kind = %outcome.kind,
                name = %outcome.name,
                endpoint = %outcome.endpoint,
                error = %e,
                "Failed to send registration reply"
            );
            return Err(e);
        }

        Ok(outcome)
    }

    /// Handle a registration on its own task inside `tasks`
    pub fn spawn(
        &self,
        tasks: &mut JoinSet<Result<RegistrationOutcome>>,
        kind: ChildKind,
        name: String,
        endpoint: SocketAddr,
    ) {
        let server = self.clone();
        tasks.spawn(async move { server.handle(kind, name, endpoint).await });
    }
}
