//! Wire Protocol
//!
//! Message schema, domain-name handling and the datagram codec shared by
//! every node.

pub mod codec;
pub mod message;
pub mod name;

pub use codec::*;
pub use message::*;
pub use name::*;
