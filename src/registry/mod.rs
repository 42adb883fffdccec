//! Registry Module
//!
//! Lock-guarded store of the hosts and subdomain servers registered with a
//! node, plus the events it emits.

pub mod events;
pub mod store;

pub use events::*;
pub use store::*;
