//! Request and reply documents exchanged with the pub/sub gateway.
//!
//! The shell never looks inside a request once it is built; replies are
//! inspected only through the accessors below so the completion engine does
//! not depend on the exact payload layout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error condition the service uses for unknown nodes.
pub const ITEM_NOT_FOUND: &str = "item-not-found";

/// A request document addressed from the actor to the pub/sub service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub from: String,
    pub to: String,
    pub operation: Operation,
}

/// The operation carried by a [`Request`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    QueryChildren {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<String>,
    },
    CreateNode {
        node: String,
        node_type: NodeType,
    },
    DeleteNode {
        node: String,
    },
    Subscribe {
        node: String,
        jid: String,
    },
    Unsubscribe {
        node: String,
        jid: String,
    },
    QuerySubscriptions {
        node: String,
    },
    QueryAffiliations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Leaf,
    Collection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Result,
    Error,
}

/// A reply document. Consumed exactly once by the pending request's handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    #[serde(default)]
    pub payload: Value,
}

/// How a reply resolves a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    Error,
}

impl Reply {
    pub fn result(payload: Value) -> Self {
        Self {
            kind: ReplyKind::Result,
            payload,
        }
    }

    /// Build an error reply carrying the given condition.
    pub fn error(condition: &str) -> Self {
        Self {
            kind: ReplyKind::Error,
            payload: serde_json::json!({ "error": { "condition": condition } }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ReplyKind::Error
    }

    /// Error subtype, e.g. `item-not-found`.
    pub fn error_condition(&self) -> Option<&str> {
        self.payload
            .get("error")
            .and_then(|e| e.get("condition"))
            .and_then(Value::as_str)
    }

    pub fn outcome(&self) -> Outcome {
        match self.kind {
            ReplyKind::Result => Outcome::Success,
            ReplyKind::Error if self.error_condition() == Some(ITEM_NOT_FOUND) => {
                Outcome::NotFound
            }
            ReplyKind::Error => Outcome::Error,
        }
    }

    /// Compact rendering of the payload, shown for unclassified errors.
    pub fn raw_payload(&self) -> String {
        self.payload.to_string()
    }

    /// Iterate the objects of a top-level array in the payload.
    pub fn entries(&self, key: &str) -> std::slice::Iter<'_, Value> {
        self.payload
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter())
            .unwrap_or_default()
    }
}

/// Frames sent by the shell to the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Auth { jid: String, password: String },
    Presence { show: String, status: String },
    Request { id: String, request: Request },
}

impl ClientFrame {
    pub fn online() -> Self {
        ClientFrame::Presence {
            show: "available".into(),
            status: "Online".into(),
        }
    }
}

/// Frames received from the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Authenticated,
    AuthenticationFailed {
        #[serde(default)]
        reason: Option<String>,
    },
    Reply {
        id: String,
        reply: Reply,
    },
}
