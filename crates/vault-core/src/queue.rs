//! Coalescing queue for whole-document rewrites.
//!
//! Callers `push` individual updates and wait for them to be flushed. A
//! single worker task owns the flush function: whenever it is idle it takes
//! everything that has been pushed so far as one batch and flushes it, so
//! updates that arrive while a flush is running are grouped into the next
//! one. Flushes never overlap, which gives every update a total order.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Result, VaultError};

struct Pending<T> {
    item: T,
    respond: oneshot::Sender<Result<()>>,
}

/// Handle for pushing updates into a flush pipeline.
///
/// Must be created from within a Tokio runtime. Dropping the handle closes
/// the queue; the worker finishes any batch already handed to it.
pub struct BatchedUpdateQueue<T> {
    sender: mpsc::UnboundedSender<Pending<T>>,
}

impl<T> BatchedUpdateQueue<T>
where
    T: Send + 'static,
{
    pub fn new<F, Fut>(flush: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, flush));
        Self { sender }
    }

    /// Queue `item` and wait until the batch containing it has been flushed.
    ///
    /// If the flush fails, every item of that batch receives the same error.
    /// Nothing is retried.
    pub async fn push(&self, item: T) -> Result<()> {
        let (respond, response) = oneshot::channel();
        self.sender
            .send(Pending { item, respond })
            .map_err(|_| VaultError::Other("Update queue is closed".to_string()))?;
        response
            .await
            .map_err(|_| VaultError::Other("Update queue dropped the request".to_string()))?
    }
}

async fn run_worker<T, F, Fut>(mut receiver: mpsc::UnboundedReceiver<Pending<T>>, flush: F)
where
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    while let Some(first) = receiver.recv().await {
        let mut items = vec![first.item];
        let mut waiters = vec![first.respond];
        while let Ok(next) = receiver.try_recv() {
            items.push(next.item);
            waiters.push(next.respond);
        }

        let batch_size = items.len();
        let result = flush(items).await;
        match &result {
            Ok(()) => debug!(batch_size, "flushed update batch"),
            Err(err) => debug!(batch_size, error = %err, "update batch failed"),
        }

        for waiter in waiters {
            // The pusher may have stopped waiting; the flush still happened.
            let _ = waiter.send(result.clone());
        }
    }
}
