//! Serialized event feed.
//!
//! Any number of producers hold a [`FeedHandle`]; a single task owns the
//! handler chain and applies events one at a time in arrival order. Each
//! delivery carries a oneshot reply so the producer still sees the result
//! of its own event.

use lpm_schemas::GatewayEvent;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{EventHandler, GatewayError};

struct Delivery {
    event: GatewayEvent,
    reply: oneshot::Sender<Result<(), GatewayError>>,
}

pub struct EventFeed;

impl EventFeed {
    /// Move `handler` onto a new task and return a producer handle.
    ///
    /// The task ends once every `FeedHandle` is dropped and yields the
    /// handler back through the join handle.
    pub fn spawn<H>(handler: H, capacity: usize) -> (FeedHandle, JoinHandle<H>)
    where
        H: EventHandler + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Delivery>(capacity.max(1));

        let task = tokio::spawn(async move {
            let mut handler = handler;
            let mut applied: u64 = 0;
            while let Some(Delivery { event, reply }) = rx.recv().await {
                let result = handler.dispatch(&event);
                match &result {
                    Ok(()) => applied += 1,
                    Err(e) => warn!(kind = event.kind(), instrument_id = event.instrument_id(), error = %e, "event rejected"),
                }
                // The producer may have stopped waiting; the event is applied regardless.
                let _ = reply.send(result);
            }
            debug!(applied, "event feed drained");
            handler
        });

        (FeedHandle { tx }, task)
    }
}

#[derive(Clone, Debug)]
pub struct FeedHandle {
    tx: mpsc::Sender<Delivery>,
}

impl FeedHandle {
    /// Queue one event and wait until it has been applied.
    pub async fn deliver(&self, event: GatewayEvent) -> Result<(), GatewayError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(Delivery { event, reply })
            .await
            .map_err(|_| GatewayError::FeedClosed)?;
        done.await.map_err(|_| GatewayError::FeedClosed)?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
