//! Name Server
//!
//! Everything a running node does: the parent handshake, accepting child
//! registrations, resolving queries and the event loop tying them together.

pub mod console;
pub mod event_loop;
pub mod handshake;
pub mod node;
pub mod registration;
pub mod resolution;
pub mod transport;

pub use console::Command;
pub use event_loop::{EventLoop, LoopExit};
pub use handshake::{HandshakeState, RegistrationClient, DEFAULT_HANDSHAKE_TIMEOUT};
pub use node::{Node, NodeConfig, PortSelection, DEFAULT_PORT_RANGE};
pub use registration::{RegistrationOutcome, RegistrationServer, CONFLICT_TEXT};
pub use resolution::ResolutionEngine;
pub use transport::{send_message, DatagramTransport};
