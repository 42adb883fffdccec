//! Protocol Messages
//!
//! The four message kinds exchanged between nodes, their children and
//! their clients.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// What a child registers as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildKind {
    /// A leaf endpoint, answered directly
    Host,
    /// A delegated name server, answered with a referral
    Subdomain,
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildKind::Host => write!(f, "host"),
            ChildKind::Subdomain => write!(f, "subdomain"),
        }
    }
}

/// Result of resolving a queried name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "endpoint", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOutcome {
    /// The name is a host; here is its endpoint
    Answer(SocketAddr),
    /// Ask this endpoint instead
    Refer(SocketAddr),
    /// No such name
    NotFound,
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOutcome::Answer(endpoint) => write!(f, "answer {}", endpoint),
            QueryOutcome::Refer(endpoint) => write!(f, "refer {}", endpoint),
            QueryOutcome::NotFound => write!(f, "not found"),
        }
    }
}

/// A single datagram's worth of protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    Register { child_kind: ChildKind, name: String },

    #[serde(rename_all = "camelCase")]
    RegisterResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_text: Option<String>,
    },

    Query { name: String },

    QueryResult { outcome: QueryOutcome },
}

impl Message {
    /// Registration request
    pub fn register(child_kind: ChildKind, name: impl Into<String>) -> Self {
        Message::Register {
            child_kind,
            name: name.into(),
        }
    }

    /// Successful registration reply
    pub fn registered() -> Self {
        Message::RegisterResult {
            success: true,
            error_text: None,
        }
    }

    /// Failed registration reply
    pub fn rejected(reason: impl Into<String>) -> Self {
        Message::RegisterResult {
            success: false,
            error_text: Some(reason.into()),
        }
    }

    /// Name lookup
    pub fn query(name: impl Into<String>) -> Self {
        Message::Query { name: name.into() }
    }

    /// Short kind label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Register { .. } => "REGISTER",
            Message::RegisterResult { .. } => "REGISTER_RESULT",
            Message::Query { .. } => "QUERY",
            Message::QueryResult { .. } => "QUERY_RESULT",
        }
    }
}

impl From<QueryOutcome> for Message {
    fn from(outcome: QueryOutcome) -> Self {
        Message::QueryResult { outcome }
    }
}
