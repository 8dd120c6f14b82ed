//! Per-process shell session: who we are, which service we talk to, and the
//! current working node.
//!
//! Readers are public. Writers are crate-private and only called by the
//! completion engine, which owns the working-node transaction.

/// Placeholder shown for the hierarchy root.
pub const ROOT_LABEL: &str = "<root>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    actor: String,
    service: String,
    current_node: Option<String>,
    // Only set while a working-node change awaits confirmation.
    previous_node: Option<String>,
}

impl Session {
    pub fn new(actor: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            service: service.into(),
            current_node: None,
            previous_node: None,
        }
    }

    pub fn actor_identity(&self) -> &str {
        &self.actor
    }

    pub fn target_service(&self) -> &str {
        &self.service
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn previous_node(&self) -> Option<&str> {
        self.previous_node.as_deref()
    }

    /// Render the prompt: `actor:node> ` or `actor:> ` at the root.
    pub fn prompt(&self) -> String {
        format!("{}:{}> ", self.actor, self.current_node().unwrap_or_default())
    }

    pub(crate) fn set_current_node(&mut self, node: Option<String>) {
        self.current_node = node;
        self.previous_node = None;
    }

    /// Snapshot the working node and optimistically move to `node`.
    pub(crate) fn begin_change(&mut self, node: String) {
        self.previous_node = self.current_node.replace(node);
    }

    pub(crate) fn commit_change(&mut self) {
        self.previous_node = None;
    }

    pub(crate) fn rollback_change(&mut self) {
        self.current_node = self.previous_node.take();
    }
}
