//! Registry Events
//!
//! Events emitted by the registry store for external consumers to react to
//! child registrations.

use crate::protocol::ChildKind;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Events emitted by the registry store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A child was registered
    Registered {
        kind: ChildKind,
        name: String,
        endpoint: SocketAddr,
    },

    /// A registration attempt was refused
    Rejected {
        kind: ChildKind,
        name: String,
        endpoint: SocketAddr,
        reason: String,
    },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Registered {
                kind,
                name,
                endpoint,
            } => write!(f, "registered {} {} => {}", kind, name, endpoint),
            RegistryEvent::Rejected {
                kind,
                name,
                endpoint,
                reason,
            } => write!(f, "rejected {} {} from {}: {}", kind, name, endpoint, reason),
        }
    }
}
