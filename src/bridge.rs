// bridge.rs — Request/reply channel between async Rust callers and the webview.
//
// The device camera and permission prompts live on the webview side. A caller
// posts a request, the host forwards it as an event, and the webview answers
// through a command that resolves the pending reply by id.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A request waiting to be forwarded to the webview.
#[derive(Debug, Clone)]
pub struct BridgeRequest<Req> {
    pub id: u64,
    pub payload: Req,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("No webview is listening")]
    Closed,
    #[error("Request was dropped before it was answered")]
    Dropped,
    #[error("No answer within {0:?}")]
    Timeout(Duration),
}

pub struct Bridge<Req, Resp> {
    outgoing: mpsc::UnboundedSender<BridgeRequest<Req>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Resp>>>,
    next_id: Mutex<u64>,
    timeout: Duration,
}

impl<Req: Send, Resp: Send> Bridge<Req, Resp> {
    /// Create a bridge plus the receiving end the host drains.
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<BridgeRequest<Req>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Self {
            outgoing: tx,
            pending: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
            timeout,
        };
        (bridge, rx)
    }

    /// Post `payload` and wait for the matching `resolve`.
    pub async fn call(&self, payload: Req) -> Result<Resp, BridgeError> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            let current = *next;
            *next += 1;
            current
        };
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);
        // Removed from `pending` on every exit, including a dropped caller.
        let _pending = PendingGuard {
            pending: &self.pending,
            id,
        };

        if self.outgoing.send(BridgeRequest { id, payload }).is_err() {
            return Err(BridgeError::Closed);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(BridgeError::Dropped),
            Err(_) => {
                log::warn!("Bridge request {} timed out", id);
                Err(BridgeError::Timeout(self.timeout))
            }
        }
    }

    /// Deliver the answer for request `id`. Returns `false` for unknown or
    /// already-expired ids.
    pub fn resolve(&self, id: u64, resp: Resp) -> bool {
        let sender = self.pending.lock().unwrap().remove(&id);
        match sender {
            Some(tx) => tx.send(resp).is_ok(),
            None => {
                log::debug!("Ignoring answer for unknown bridge request {}", id);
                false
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

struct PendingGuard<'a, Resp> {
    pending: &'a Mutex<HashMap<u64, oneshot::Sender<Resp>>>,
    id: u64,
}

impl<Resp> Drop for PendingGuard<'_, Resp> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn call_resolves_with_answer() {
        let (bridge, mut rx) = Bridge::<&'static str, u32>::new(Duration::from_secs(5));
        let bridge = Arc::new(bridge);

        let responder = Arc::clone(&bridge);
        tokio::spawn(async move {
            let req = rx.recv().await.unwrap();
            assert_eq!(req.payload, "ping");
            responder.resolve(req.id, 42);
        });

        assert_eq!(bridge.call("ping").await, Ok(42));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn call_times_out_and_forgets_request() {
        let (bridge, _rx) = Bridge::<(), ()>::new(Duration::from_millis(20));
        assert_eq!(
            bridge.call(()).await,
            Err(BridgeError::Timeout(Duration::from_millis(20)))
        );
        assert_eq!(bridge.pending_count(), 0);
        assert!(!bridge.resolve(1, ()));
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = BridgeError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "No answer within 250ms");
    }

    #[tokio::test]
    async fn abandoned_call_forgets_request() {
        let (bridge, mut rx) = Bridge::<(), ()>::new(Duration::from_secs(30));

        // The caller gives up long before the bridge would time out.
        let outcome = tokio::time::timeout(Duration::from_millis(20), bridge.call(())).await;
        assert!(outcome.is_err());

        let req = rx.recv().await.unwrap();
        assert_eq!(bridge.pending_count(), 0);
        assert!(!bridge.resolve(req.id, ()));
    }

    #[tokio::test]
    async fn call_fails_when_receiver_is_gone() {
        let (bridge, rx) = Bridge::<(), ()>::new(Duration::from_secs(1));
        drop(rx);
        assert_eq!(bridge.call(()).await, Err(BridgeError::Closed));
    }

    #[test]
    fn resolve_unknown_id_is_ignored() {
        let (bridge, _rx) = Bridge::<(), u8>::new(Duration::from_secs(1));
        assert!(!bridge.resolve(99, 1));
    }
}
