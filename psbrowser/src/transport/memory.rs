//! In-process transport.
//!
//! Requests are either answered on the spot by a responder function or
//! parked until [`MemoryTransport::reply_next`] is called. Clones share the
//! same state, so one clone can drive replies while another is owned by the
//! completion engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TransportError;
use crate::protocol::{ClientFrame, Reply, Request};

use super::{ReplyHandler, Transport};

type Responder = dyn Fn(&Request) -> Option<Reply> + Send + Sync;

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<ClientFrame>>,
    requests: Mutex<Vec<Request>>,
    parked: Mutex<VecDeque<ReplyHandler>>,
    closed: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
    responder: Option<Arc<Responder>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryTransport {
    /// Transport that parks every request until answered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that answers each request with `responder`. Requests it
    /// returns `None` for stay parked (a silent server).
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&Request) -> Option<Reply> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::default(),
            responder: Some(Arc::new(responder)),
        }
    }

    /// Fire-and-forget frames sent so far.
    pub fn sent_frames(&self) -> Vec<ClientFrame> {
        lock(&self.shared.sent).clone()
    }

    /// Every awaited request, in send order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.shared.requests).clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.shared.parked).len()
    }

    /// Answer the oldest parked request. Returns false when nothing is
    /// waiting or the waiter already gave up.
    pub fn reply_next(&self, reply: Reply) -> bool {
        let handler = lock(&self.shared.parked).pop_front();
        handler.is_some_and(|h| h.send(reply).is_ok())
    }

    /// Drop every parked handler, as a lost connection would.
    pub fn drop_pending(&self) {
        lock(&self.shared.parked).clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        lock(&self.shared.sent).push(frame);
        Ok(())
    }

    fn send_and_await(
        &self,
        request: Request,
        on_reply: ReplyHandler,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let answer = self.responder.as_ref().and_then(|r| r(&request));
        lock(&self.shared.requests).push(request);
        match answer {
            Some(reply) => {
                let _ = on_reply.send(reply);
            }
            None => lock(&self.shared.parked).push_back(on_reply),
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.drop_pending();
    }
}
