//! Resolution Engine
//!
//! Answers name queries from this node's registry, or points the caller at
//! a node better placed to answer. Resolution is iterative: the engine
//! never forwards a query itself.
//!
//! Precedence for a queried name, relative to this node's domain:
//!
//! 1. the node's own domain: answer with this node's endpoint
//! 2. a single label naming a registered host: answer with the host
//! 3. a name under a registered subdomain: refer to that subdomain
//! 4. any other name inside this domain: not found
//! 5. a name outside this domain: refer to the parent, or not found at
//!    the root

use crate::protocol::{DomainName, QueryOutcome};
use crate::registry::RegistryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Resolves queries against one node's registry
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    registry: Arc<RegistryStore>,
    local: SocketAddr,
    parent: Option<SocketAddr>,
}

impl ResolutionEngine {
    pub fn new(registry: Arc<RegistryStore>, local: SocketAddr, parent: Option<SocketAddr>) -> Self {
        Self {
            registry,
            local,
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Resolve `name`
    pub fn resolve(&self, name: &str) -> QueryOutcome {
        let queried = match DomainName::parse(name) {
            Ok(queried) => queried,
            Err(e) => {
                debug!(name, error = %e, "Query for an invalid name");
                return QueryOutcome::NotFound;
            }
        };

        let zone = self.registry.domain();
        let Some(relative) = queried.relative_to(zone) else {
            return self.escalate();
        };

        // The label directly below this zone decides who is responsible
        let Some((child, deeper)) = relative.split_last() else {
            return QueryOutcome::Answer(self.local);
        };

        if deeper.is_empty() {
            if let Some(host) = self.registry.lookup_host(child) {
                return QueryOutcome::Answer(host);
            }
        }

        match self.registry.lookup_subdomain(child) {
            Some(server) => QueryOutcome::Refer(server),
            None => QueryOutcome::NotFound,
        }
    }

    /// Outcome for names this node has no visibility into
    fn escalate(&self) -> QueryOutcome {
        match self.parent {
            Some(parent) => QueryOutcome::Refer(parent),
            None => QueryOutcome::NotFound,
        }
    }
}
