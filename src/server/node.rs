//! Name-Server Node
//!
//! Composition root for one node: its domain, its socket, its optional
//! parent and its registry. The socket is opened when the node is bound and
//! released when the node is consumed by [`Node::run`], whichever way that
//! ends.

use super::event_loop::{EventLoop, LoopExit};
use super::handshake::{RegistrationClient, DEFAULT_HANDSHAKE_TIMEOUT};
use super::resolution::ResolutionEngine;
use super::transport::DatagramTransport;
use crate::error::{Error, Result};
use crate::protocol::DomainName;
use crate::registry::RegistryStore;
use rand::Rng;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, info};

// =============================================================================
// Node Configuration
// =============================================================================

/// Ports a node picks from when none is given
pub const DEFAULT_PORT_RANGE: RangeInclusive<u16> = 53000..=53999;

/// Random picks tried before giving up on a busy range
const RANDOM_BIND_ATTEMPTS: usize = 16;

/// How the node's port is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    /// Pick a free port at random from the range
    Random(RangeInclusive<u16>),
    /// Bind exactly this port (0 lets the OS choose)
    Fixed(u16),
}

impl Default for PortSelection {
    fn default() -> Self {
        PortSelection::Random(DEFAULT_PORT_RANGE)
    }
}

/// Configuration for a node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Domain this node is authoritative for
    pub domain: DomainName,
    /// Local address to bind; must be loopback
    pub bind_host: IpAddr,
    /// Port selection
    pub port: PortSelection,
    /// Parent node; absent for the root
    pub parent: Option<SocketAddr>,
    /// Bound on the startup handshake
    pub handshake_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            domain: DomainName::root(),
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: PortSelection::default(),
            parent: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl NodeConfig {
    /// Root node configuration
    pub fn root() -> Self {
        Self::default()
    }

    /// Child node configuration registering with `parent`
    pub fn child(domain: DomainName, parent: SocketAddr) -> Self {
        Self {
            domain,
            parent: Some(parent),
            ..Default::default()
        }
    }

    /// Use a fixed port instead of a random one
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = PortSelection::Fixed(port);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if !self.bind_host.is_loopback() {
            return Err(Error::Configuration(format!(
                "bind host {} is not a loopback address",
                self.bind_host
            )));
        }

        match (self.domain.is_root(), self.parent) {
            (true, Some(parent)) => {
                return Err(Error::Configuration(format!(
                    "the root domain cannot have a parent (got {})",
                    parent
                )))
            }
            (false, None) => {
                return Err(Error::Configuration(format!(
                    "domain {} needs a parent to register with",
                    self.domain
                )))
            }
            _ => {}
        }

        if let PortSelection::Random(range) = &self.port {
            if range.is_empty() {
                return Err(Error::Configuration("empty port range".to_string()));
            }
        }

        if self.handshake_timeout.is_zero() {
            return Err(Error::Configuration(
                "handshake timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Node
// =============================================================================

/// A bound, not yet running, name-server node
pub struct Node {
    config: NodeConfig,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    registry: Arc<RegistryStore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("domain", &self.config.domain)
            .field("local_addr", &self.local_addr)
            .field("parent", &self.config.parent)
            .finish()
    }
}

impl Node {
    /// Validate `config` and open the node's socket
    pub async fn bind(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        let socket = bind_socket(config.bind_host, &config.port).await?;
        let local_addr = socket.local_addr()?;
        let registry = RegistryStore::new(config.domain.clone());
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(domain = %config.domain, %local_addr, "Node bound");

        Ok(Self {
            config,
            socket: Arc::new(socket),
            local_addr,
            registry,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn domain(&self) -> &DomainName {
        &self.config.domain
    }

    pub fn parent(&self) -> Option<SocketAddr> {
        self.config.parent
    }

    pub fn registry(&self) -> Arc<RegistryStore> {
        self.registry.clone()
    }

    /// Handle that stops a running node when sent to
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Register with the parent, then serve until shut down.
    ///
    /// A failed handshake returns before any traffic is served. The socket
    /// is closed when this returns, on every path.
    pub async fn run<R, W>(self, console: R, output: W) -> Result<LoopExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut client = RegistrationClient::new(
            self.config.domain.clone(),
            self.config.parent,
            self.config.handshake_timeout,
        );
        client.register(self.socket.as_ref()).await?;

        let transport: Arc<dyn DatagramTransport> = self.socket.clone();
        let resolution =
            ResolutionEngine::new(self.registry.clone(), self.local_addr, self.config.parent);
        let event_loop = EventLoop::new(
            transport,
            self.registry.clone(),
            resolution,
            console,
            output,
            self.shutdown_tx.subscribe(),
        );

        info!(domain = %self.config.domain, addr = %self.local_addr, "Serving");
        let exit = event_loop.run().await;

        info!(domain = %self.config.domain, "Node shut down");
        Ok(exit)
    }
}

async fn bind_socket(host: IpAddr, port: &PortSelection) -> Result<UdpSocket> {
    match port {
        PortSelection::Fixed(port) => Ok(UdpSocket::bind(SocketAddr::new(host, *port)).await?),
        PortSelection::Random(range) => {
            for _ in 0..RANDOM_BIND_ATTEMPTS {
                let port = rand::thread_rng().gen_range(range.clone());
                match UdpSocket::bind(SocketAddr::new(host, port)).await {
                    Ok(socket) => return Ok(socket),
                    Err(e) if e.kind() == ErrorKind::AddrInUse => {
                        debug!(port, "Port in use, picking another");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(Error::Configuration(format!(
                "no free port found in {}..={} after {} attempts",
                range.start(),
                range.end(),
                RANDOM_BIND_ATTEMPTS
            )))
        }
    }
}
