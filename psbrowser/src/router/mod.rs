//! Completion engine: the single-flight request slot between the shell loop
//! and the transport.
//!
//! The engine is either idle or awaiting exactly one reply. [`Router::issue`]
//! moves it to awaiting; [`Router::complete`] suspends until the reply
//! arrives, the request times out, or the transport drops the handler, then
//! applies the command's [`Completion`] and returns to idle. Session state is
//! only changed from inside these two operations.

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::RouterError;
use crate::protocol::{Outcome, Reply, Request};
use crate::session::Session;
use crate::transport::Transport;

mod completion;

pub use completion::Completion;

/// Default time to wait for a reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the last command was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing was in flight; the command finished synchronously.
    Immediate,
    Replied(Outcome),
    TimedOut,
    /// The transport dropped the reply handler.
    Disconnected,
}

struct InFlight {
    command: String,
    issued_at: Instant,
    reply: oneshot::Receiver<Reply>,
    completion: Completion,
}

enum State {
    Idle,
    AwaitingReply(InFlight),
}

pub struct Router<T> {
    transport: T,
    timeout: Duration,
    state: State,
}

impl<T: Transport> Router<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            state: State::Idle,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Name of the command whose reply is awaited, if any.
    pub fn pending_command(&self) -> Option<&str> {
        match &self.state {
            State::Idle => None,
            State::AwaitingReply(inflight) => Some(&inflight.command),
        }
    }

    /// Send `request` and take the in-flight slot.
    pub fn issue(
        &mut self,
        command: &str,
        request: Request,
        completion: Completion,
        session: &mut Session,
    ) -> Result<(), RouterError> {
        if let State::AwaitingReply(inflight) = &self.state {
            return Err(RouterError::ConcurrencyViolation {
                pending: inflight.command.clone(),
                requested: command.to_string(),
            });
        }

        completion.on_issue(session);
        let (tx, rx) = oneshot::channel();
        if let Err(e) = self.transport.send_and_await(request, tx) {
            completion.abandon(session);
            return Err(e.into());
        }
        debug!(command, "request issued");
        self.state = State::AwaitingReply(InFlight {
            command: command.to_string(),
            issued_at: Instant::now(),
            reply: rx,
            completion,
        });
        Ok(())
    }

    /// Wait for the in-flight request to resolve and apply its completion.
    ///
    /// Returns [`Resolution::Immediate`] when nothing is in flight. The
    /// engine is idle again when this returns, whatever the outcome.
    pub async fn complete<W: Write>(
        &mut self,
        session: &mut Session,
        out: &mut W,
    ) -> io::Result<Resolution> {
        let State::AwaitingReply(inflight) = std::mem::replace(&mut self.state, State::Idle)
        else {
            return Ok(Resolution::Immediate);
        };
        let InFlight {
            command,
            issued_at,
            reply,
            completion,
        } = inflight;

        // The bound runs from issue, not from when the caller starts waiting.
        match tokio::time::timeout_at(issued_at + self.timeout, reply).await {
            Ok(Ok(reply)) => {
                let outcome = completion.on_reply(&reply, session, out)?;
                debug!(
                    command = command.as_str(),
                    ?outcome,
                    elapsed_ms = issued_at.elapsed().as_millis() as u64,
                    "request resolved"
                );
                Ok(Resolution::Replied(outcome))
            }
            Ok(Err(_)) => {
                warn!(command = command.as_str(), "reply handler dropped");
                completion.abandon(session);
                writeln!(out, "Connection lost while waiting for '{command}'")?;
                Ok(Resolution::Disconnected)
            }
            Err(_) => {
                warn!(command = command.as_str(), timeout = ?self.timeout, "request timed out");
                completion.abandon(session);
                writeln!(out, "Command '{command}' timed out after {:?}", self.timeout)?;
                Ok(Resolution::TimedOut)
            }
        }
    }

    /// Move the working node to the root. No request is involved.
    pub fn change_to_root(&mut self, session: &mut Session) -> Result<Resolution, RouterError> {
        if let Some(pending) = self.pending_command() {
            return Err(RouterError::ConcurrencyViolation {
                pending: pending.to_string(),
                requested: "cd".to_string(),
            });
        }
        session.set_current_node(None);
        Ok(Resolution::Immediate)
    }
}
