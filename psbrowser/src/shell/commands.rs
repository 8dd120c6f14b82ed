//! Built-in commands.

use std::io::Write;

use anyhow::{Result, anyhow};

use crate::protocol::Request;
use crate::registry::CommandRegistry;
use crate::request::{self, normalize_node};
use crate::router::Completion;
use crate::session::ROOT_LABEL;
use crate::transport::Transport;

use super::Shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Help,
    List,
    ChangeNode,
    PrintNode,
    Remove,
    MakeNode,
    Subscribe,
    Unsubscribe,
    Subscriptions,
    Affiliations,
}

const COMMANDS: &[(&str, usize, &str, Handler)] = &[
    ("help", 0, "show this help", Handler::Help),
    (
        "ls",
        0,
        "list child nodes of [node] or the working node",
        Handler::List,
    ),
    (
        "cd",
        0,
        "change the working node; no argument goes to the root",
        Handler::ChangeNode,
    ),
    ("pwd", 0, "print the working node", Handler::PrintNode),
    ("rm", 1, "delete <node>", Handler::Remove),
    ("mkdir", 1, "create collection node <node>", Handler::MakeNode),
    ("subscribe", 1, "subscribe [subscriber] to <node>", Handler::Subscribe),
    (
        "unsubscribe",
        1,
        "unsubscribe [subscriber] from <node>",
        Handler::Unsubscribe,
    ),
    (
        "subscriptions",
        1,
        "list subscriptions of <node>",
        Handler::Subscriptions,
    ),
    ("affiliations", 0, "list your affiliations", Handler::Affiliations),
];

/// Registry holding every built-in command in help order.
pub fn default_registry() -> CommandRegistry<Handler> {
    let mut registry = CommandRegistry::new();
    for &(name, min_params, help, handler) in COMMANDS {
        let registered = registry.register(name, min_params, help, handler);
        debug_assert!(registered.is_ok(), "duplicate command '{name}'");
    }
    registry
}

impl<T: Transport, W: Write> Shell<T, W> {
    pub(super) fn dispatch(
        &mut self,
        handler: Handler,
        command: &str,
        params: &[String],
    ) -> Result<()> {
        let first = params.first().map(String::as_str);
        match handler {
            Handler::Help => self.help(),
            Handler::List => self.list(command, first),
            Handler::ChangeNode => self.change_node(command, first),
            Handler::PrintNode => self.print_node(),
            Handler::Remove => {
                let node = node_param(params)?;
                let req = request::delete_node(self.actor(), self.service(), node);
                self.issue(command, req, Completion::Acknowledge)
            }
            Handler::MakeNode => {
                let node = node_param(params)?;
                let req = request::create_collection_node(self.actor(), self.service(), node);
                self.issue(command, req, Completion::Acknowledge)
            }
            Handler::Subscribe => {
                let node = node_param(params)?;
                let subscriber = params.get(1).map(String::as_str);
                let req = request::subscribe(self.actor(), self.service(), node, subscriber);
                self.issue(command, req, Completion::Acknowledge)
            }
            Handler::Unsubscribe => {
                let node = node_param(params)?;
                let subscriber = params.get(1).map(String::as_str);
                let req = request::unsubscribe(self.actor(), self.service(), node, subscriber);
                self.issue(command, req, Completion::Acknowledge)
            }
            Handler::Subscriptions => {
                let node = node_param(params)?;
                let req = request::query_subscriptions(self.actor(), self.service(), node);
                let completion = Completion::Subscriptions {
                    node: node.to_string(),
                };
                self.issue(command, req, completion)
            }
            Handler::Affiliations => {
                let req = request::query_affiliations(self.actor(), self.service());
                self.issue(command, req, Completion::Affiliations)
            }
        }
    }

    fn actor(&self) -> &str {
        self.session.actor_identity()
    }

    fn service(&self) -> &str {
        self.session.target_service()
    }

    fn issue(&mut self, command: &str, req: Request, completion: Completion) -> Result<()> {
        self.router.issue(command, req, completion, &mut self.session)?;
        Ok(())
    }

    fn help(&mut self) -> Result<()> {
        for cmd in self.registry.list() {
            writeln!(self.out, "{} : {}", cmd.name, cmd.help)?;
        }
        Ok(())
    }

    fn list(&mut self, command: &str, node: Option<&str>) -> Result<()> {
        // An explicit parameter wins over the working node.
        let target = node
            .map(normalize_node)
            .filter(|n| !n.is_empty())
            .or_else(|| self.session.current_node().map(str::to_string));
        let req = request::query_children(self.actor(), self.service(), target.as_deref());
        self.issue(command, req, Completion::Listing { target })
    }

    fn change_node(&mut self, command: &str, node: Option<&str>) -> Result<()> {
        let node = node.map(normalize_node).filter(|n| !n.is_empty());
        let Some(node) = node else {
            self.router.change_to_root(&mut self.session)?;
            return Ok(());
        };
        let req = request::query_children(self.actor(), self.service(), Some(node.as_str()));
        self.issue(command, req, Completion::ChangeNode { node })
    }

    fn print_node(&mut self) -> Result<()> {
        let node = self.session.current_node().unwrap_or(ROOT_LABEL);
        writeln!(self.out, "{node}")?;
        Ok(())
    }
}

// The registry already enforced min_params, so this only guards indexing.
fn node_param(params: &[String]) -> Result<&str> {
    params
        .first()
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing node parameter"))
}
