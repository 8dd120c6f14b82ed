//! Request builders, one per shell operation.
//!
//! Every builder is pure: the same inputs always produce the same request.
//! Request ids and correlation belong to the transport.

use crate::protocol::{NodeType, Operation, Request};

/// Strip trailing `/` separators from a node name (`"foo///"` -> `"foo"`).
pub fn normalize_node(name: &str) -> String {
    name.trim_end_matches('/').to_string()
}

fn request(from: &str, to: &str, operation: Operation) -> Request {
    Request {
        from: from.to_string(),
        to: to.to_string(),
        operation,
    }
}

/// List the direct children of `node`, or of the root when `node` is `None`.
pub fn query_children(from: &str, to: &str, node: Option<&str>) -> Request {
    request(
        from,
        to,
        Operation::QueryChildren {
            node: node.map(normalize_node),
        },
    )
}

pub fn create_collection_node(from: &str, to: &str, node: &str) -> Request {
    request(
        from,
        to,
        Operation::CreateNode {
            node: node.to_string(),
            node_type: NodeType::Collection,
        },
    )
}

pub fn delete_node(from: &str, to: &str, node: &str) -> Request {
    request(
        from,
        to,
        Operation::DeleteNode {
            node: node.to_string(),
        },
    )
}

/// Subscribe `subscriber` (the actor itself when `None`) to `node`.
pub fn subscribe(from: &str, to: &str, node: &str, subscriber: Option<&str>) -> Request {
    request(
        from,
        to,
        Operation::Subscribe {
            node: node.to_string(),
            jid: subscriber.unwrap_or(from).to_string(),
        },
    )
}

/// Unsubscribe `subscriber` (the actor itself when `None`) from `node`.
pub fn unsubscribe(from: &str, to: &str, node: &str, subscriber: Option<&str>) -> Request {
    request(
        from,
        to,
        Operation::Unsubscribe {
            node: node.to_string(),
            jid: subscriber.unwrap_or(from).to_string(),
        },
    )
}

pub fn query_subscriptions(from: &str, to: &str, node: &str) -> Request {
    request(
        from,
        to,
        Operation::QuerySubscriptions {
            node: node.to_string(),
        },
    )
}

pub fn query_affiliations(from: &str, to: &str) -> Request {
    request(from, to, Operation::QueryAffiliations)
}
