//! What to do with the reply of each kind of command.
//!
//! A [`Completion`] is created together with the request it belongs to and
//! carries everything its reply handling needs, so nothing is captured from
//! the shell loop.

use std::io::{self, Write};

use serde_json::Value;

use crate::protocol::{Outcome, Reply};
use crate::session::{ROOT_LABEL, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Print child node names (`ls`).
    Listing { target: Option<String> },
    /// Confirm or roll back a working-node change (`cd`).
    ChangeNode { node: String },
    /// Generic acknowledgement (`mkdir`, `rm`, `subscribe`, `unsubscribe`).
    Acknowledge,
    /// Print `jid (state)` per subscription of `node`.
    Subscriptions { node: String },
    /// Print `node (affiliation)` per affiliation of the actor.
    Affiliations,
}

impl Completion {
    /// Session effects applied when the request is issued.
    pub(crate) fn on_issue(&self, session: &mut Session) {
        if let Completion::ChangeNode { node } = self {
            session.begin_change(node.clone());
        }
    }

    /// Handle the reply; returns how it was classified.
    pub(crate) fn on_reply<W: Write>(
        self,
        reply: &Reply,
        session: &mut Session,
        out: &mut W,
    ) -> io::Result<Outcome> {
        let outcome = reply.outcome();
        match self {
            Completion::Listing { target } => match outcome {
                Outcome::Success => {
                    for node in reply.entries("items").filter_map(|i| field(i, "node")) {
                        writeln!(out, "{node}")?;
                    }
                }
                _ => report_error(reply, target.as_deref(), out)?,
            },
            Completion::ChangeNode { node } => match outcome {
                Outcome::Success => session.commit_change(),
                _ => {
                    session.rollback_change();
                    not_found(&node, out)?;
                }
            },
            Completion::Acknowledge => {
                if outcome != Outcome::Success {
                    writeln!(out, "{}", reply.raw_payload())?;
                }
            }
            Completion::Subscriptions { node } => match outcome {
                Outcome::Success => print_pairs(reply, "subscriptions", "jid", "subscription", out)?,
                _ => report_error(reply, Some(node.as_str()), out)?,
            },
            Completion::Affiliations => match outcome {
                Outcome::Success => print_pairs(reply, "affiliations", "node", "affiliation", out)?,
                _ => report_error(reply, None, out)?,
            },
        }
        Ok(outcome)
    }

    /// Undo issue-time effects when no reply will be processed.
    pub(crate) fn abandon(self, session: &mut Session) {
        if let Completion::ChangeNode { .. } = self {
            session.rollback_change();
        }
    }
}

fn field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

fn not_found<W: Write>(node: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "Node '{node}' not found")
}

fn report_error<W: Write>(reply: &Reply, node: Option<&str>, out: &mut W) -> io::Result<()> {
    match reply.outcome() {
        Outcome::NotFound => not_found(node.unwrap_or(ROOT_LABEL), out),
        _ => writeln!(out, "{}", reply.raw_payload()),
    }
}

fn print_pairs<W: Write>(
    reply: &Reply,
    list: &str,
    primary: &str,
    secondary: &str,
    out: &mut W,
) -> io::Result<()> {
    for entry in reply.entries(list) {
        let Some(first) = field(entry, primary) else {
            continue;
        };
        let second = field(entry, secondary).unwrap_or("none");
        writeln!(out, "{first} ({second})")?;
    }
    Ok(())
}
