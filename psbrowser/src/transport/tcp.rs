//! Line-delimited JSON transport over TCP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::{ClientFrame, Request, ServerFrame};

use super::{Credentials, ReplyHandler, Transport, TransportEvent};

type PendingMap = Arc<Mutex<HashMap<String, ReplyHandler>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<String, ReplyHandler>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct TcpTransport {
    outbound: mpsc::UnboundedSender<ClientFrame>,
    pending: PendingMap,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl TcpTransport {
    /// Connect to the gateway and start the login handshake.
    ///
    /// The returned receiver yields [`TransportEvent`]s; pass it to
    /// [`super::authenticate`] to finish logging in.
    pub async fn connect(
        address: &str,
        port: u16,
        credentials: &Credentials,
        max_frame_bytes: usize,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let target = format!("{address}:{port}");
        let stream = TcpStream::connect(&target)
            .await
            .map_err(|source| TransportError::Connect {
                address: target.clone(),
                source,
            })?;
        info!(%target, jid = %credentials.jid, "connected");
        Ok(Self::from_stream(stream, credentials, max_frame_bytes))
    }

    /// Run the transport over an already established byte stream.
    pub fn from_stream<S>(
        stream: S,
        credentials: &Credentials,
        max_frame_bytes: usize,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader = FramedRead::new(read_half, LinesCodec::new_with_max_length(max_frame_bytes));
        let writer = FramedWrite::new(write_half, LinesCodec::new());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let pending: PendingMap = Arc::default();
        let shutdown = CancellationToken::new();

        tokio::spawn(write_frames(writer, outbound_rx, shutdown.clone()));
        tokio::spawn(read_frames(
            reader,
            pending.clone(),
            events_tx,
            shutdown.clone(),
        ));

        // The login frame always goes out first.
        outbound_tx
            .send(ClientFrame::Auth {
                jid: credentials.jid.clone(),
                password: credentials.password.clone(),
            })
            .ok();

        let transport = Self {
            outbound: outbound_tx,
            pending,
            next_id: AtomicU64::new(1),
            shutdown,
        };
        (transport, events_rx)
    }

    fn next_request_id(&self) -> String {
        format!("psb-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Transport for TcpTransport {
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    fn send_and_await(
        &self,
        request: Request,
        on_reply: ReplyHandler,
    ) -> Result<(), TransportError> {
        let id = self.next_request_id();
        register_pending(&self.pending, &self.shutdown, id.clone(), on_reply)?;
        debug!(%id, "request queued");
        if self
            .outbound
            .send(ClientFrame::Request {
                id: id.clone(),
                request,
            })
            .is_err()
        {
            lock(&self.pending).remove(&id);
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Park `handler` under `id` unless the connection is already shut down.
///
/// The reader cancels the token before it clears the map, so checking the
/// token under the lock means a handler is either cleared or never parked.
fn register_pending(
    pending: &PendingMap,
    shutdown: &CancellationToken,
    id: String,
    handler: ReplyHandler,
) -> Result<(), TransportError> {
    let mut pending = lock(pending);
    if shutdown.is_cancelled() {
        return Err(TransportError::Closed);
    }
    // Waiters that gave up (timeouts) will never read their reply.
    pending.retain(|_, handler| !handler.is_closed());
    pending.insert(id, handler);
    Ok(())
}

async fn write_frames<W>(
    mut writer: FramedWrite<W, LinesCodec>,
    mut outbound: mpsc::UnboundedReceiver<ClientFrame>,
    shutdown: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = outbound.recv() => {
                let Some(frame) = frame else { break; };
                let line = match serde_json::to_string(&frame) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("failed to encode frame: {e}");
                        continue;
                    }
                };
                if let Err(e) = writer.send(line).await {
                    warn!("write to gateway failed: {e}");
                    break;
                }
            }
        }
    }
    shutdown.cancel();
}

async fn read_frames<R>(
    mut reader: FramedRead<R, LinesCodec>,
    pending: PendingMap,
    events: mpsc::UnboundedSender<TransportEvent>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = reader.next() => match next {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!("gateway read error: {e}");
                    break;
                }
                None => {
                    info!("gateway closed the connection");
                    break;
                }
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ServerFrame>(&line) {
            Ok(frame) => route_frame(frame, &pending, &events),
            Err(e) => warn!("ignoring undecodable frame: {e}"),
        }
    }

    shutdown.cancel();
    // Dropping the handlers resolves every waiter as disconnected.
    lock(&pending).clear();
    events.send(TransportEvent::Disconnected).ok();
}

fn route_frame(
    frame: ServerFrame,
    pending: &PendingMap,
    events: &mpsc::UnboundedSender<TransportEvent>,
) {
    match frame {
        ServerFrame::Authenticated => {
            events.send(TransportEvent::Authenticated).ok();
        }
        ServerFrame::AuthenticationFailed { reason } => {
            let reason = reason.unwrap_or_else(|| "not-authorized".to_string());
            events.send(TransportEvent::AuthenticationFailed(reason)).ok();
        }
        ServerFrame::Reply { id, reply } => {
            let handler = lock(pending).remove(&id);
            let Some(handler) = handler else {
                warn!("no pending request for id {id}");
                return;
            };
            if handler.send(reply).is_err() {
                debug!(%id, "reply arrived after its request was abandoned");
            }
        }
    }
}
