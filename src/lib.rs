//! treedns - Hierarchical Name Resolution
//!
//! A tree of independent name-server nodes. Each node is authoritative for
//! one domain, accepts registrations from child hosts and child subdomain
//! servers, and answers queries directly or refers the caller up or down
//! the tree.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Node                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   startup: RegistrationClient ──REGISTER──▶ parent (bounded)     │
//! │                                                                  │
//! │   ┌──────────────────────── EventLoop ────────────────────────┐  │
//! │   │  UDP socket      operator console      shutdown signal    │  │
//! │   └──────┬───────────────────┬────────────────────────────────┘  │
//! │          │                   │                                   │
//! │   ┌──────┴───────┐   ┌───────┴────────┐                          │
//! │   │ Registration │   │   Resolution   │                          │
//! │   │   Server     │   │    Engine      │                          │
//! │   │ (task/req)   │   │   (inline)     │                          │
//! │   └──────┬───────┘   └───────┬────────┘                          │
//! │          │ write             │ read                              │
//! │   ┌──────┴───────────────────┴────────┐                          │
//! │   │ RegistryStore (hosts, subdomains) │                          │
//! │   └───────────────────────────────────┘                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`protocol`]: Message schema, domain names and the datagram codec
//! - [`registry`]: Lock-guarded registry of hosts and subdomains
//! - [`server`]: Handshake, registration, resolution and the event loop
//! - [`error`]: Error types and handling

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

// Re-export commonly used types
pub use error::{Error, Result};

pub use protocol::{ChildKind, DomainName, Message, MessageCodec, QueryOutcome};

pub use registry::{RegistryEntry, RegistryEvent, RegistryStatsSnapshot, RegistryStore};

pub use server::{
    EventLoop, LoopExit, Node, NodeConfig, PortSelection, RegistrationClient,
    RegistrationServer, ResolutionEngine,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
