//! Transport collaborator: delivers requests to the pub/sub service and
//! hands each reply to the one-shot handler registered with it.
//!
//! The shell core only sees the [`Transport`] trait. [`TcpTransport`] talks
//! to a gateway over TCP; [`MemoryTransport`] answers in-process.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::TransportError;
use crate::protocol::{ClientFrame, Reply, Request};

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

/// One-shot reply handler for a single awaited request.
///
/// Dropping it without sending tells the waiting side that no reply will
/// ever arrive.
pub type ReplyHandler = oneshot::Sender<Reply>;

/// Connection lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Authenticated,
    AuthenticationFailed(String),
    Disconnected,
}

/// Login material for the actor identity.
#[derive(Clone)]
pub struct Credentials {
    pub jid: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("jid", &self.jid)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait Transport {
    /// Fire-and-forget send.
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError>;

    /// Send `request` and register `on_reply` for its answer.
    fn send_and_await(&self, request: Request, on_reply: ReplyHandler)
    -> Result<(), TransportError>;

    fn disconnect(&self);
}

/// Wait for the outcome of the login handshake.
///
/// On success the actor announces itself as online. On failure the
/// connection is torn down.
pub async fn authenticate<T: Transport>(
    transport: &T,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    timeout: Duration,
) -> Result<(), TransportError> {
    let event = match tokio::time::timeout(timeout, events.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => TransportEvent::Disconnected,
        Err(_) => {
            transport.disconnect();
            return Err(TransportError::AuthTimeout(timeout));
        }
    };

    match event {
        TransportEvent::Authenticated => {
            info!("authenticated");
            transport.send(ClientFrame::online())
        }
        TransportEvent::AuthenticationFailed(reason) => {
            warn!("authentication failed: {reason}");
            transport.disconnect();
            Err(TransportError::AuthenticationFailed(reason))
        }
        TransportEvent::Disconnected => Err(TransportError::Closed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authenticated_session_announces_presence() {
        let transport = MemoryTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::Authenticated).expect("queue event");

        authenticate(&transport, &mut rx, Duration::from_secs(1))
            .await
            .expect("authenticated");
        assert_eq!(transport.sent_frames(), vec![ClientFrame::online()]);
    }

    #[tokio::test]
    async fn rejected_credentials_disconnect() {
        let transport = MemoryTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::AuthenticationFailed("not-authorized".into()))
            .expect("queue event");

        let err = authenticate(&transport, &mut rx, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::AuthenticationFailed(ref r) if r == "not-authorized"));
        assert!(transport.is_closed());
        assert!(transport.sent_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let transport = MemoryTransport::new();
        let (_tx, mut rx) = mpsc::unbounded_channel();

        let err = authenticate(&transport, &mut rx, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::AuthTimeout(_)));
        assert!(transport.is_closed());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            jid: "alice@example.org".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice@example.org"));
        assert!(!rendered.contains("hunter2"));
    }
}
