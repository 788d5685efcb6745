//! Typed event streams with context-scoped listeners.
//!
//! Each `EventStream<T>` owns its own listener list; there is no global bus.
//! Listeners are registered under a `ListenerContext` so that everything a
//! subscriber registered can be removed in one call. `publish` fans out
//! synchronously, in registration order, on the caller's task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Identifies one subscriber's group of listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerContext(u64);

impl ListenerContext {
    pub fn new() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerContext {
    fn default() -> Self {
        Self::new()
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A single kind of event and the listeners interested in it.
pub struct EventStream<T> {
    listeners: Mutex<Vec<(ListenerContext, Callback<T>)>>,
}

impl<T> EventStream<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<(ListenerContext, Callback<T>)>> {
        // A listener that panicked must not disable the stream for everyone else.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `callback` under `context`.
    pub fn listen<F>(&self, context: ListenerContext, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.guard().push((context, Arc::new(callback)));
    }

    /// Remove every listener registered under `context`.
    ///
    /// Returns the number of listeners removed.
    pub fn ignore_context(&self, context: ListenerContext) -> usize {
        let mut listeners = self.guard();
        let before = listeners.len();
        listeners.retain(|(owner, _)| *owner != context);
        before - listeners.len()
    }

    /// Deliver `event` to every registered listener.
    ///
    /// Listeners are invoked outside the internal lock, so a callback may
    /// register or remove listeners on the same stream.
    pub fn publish(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self
            .guard()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.guard().len()
    }
}

impl<T> EventStream<T>
where
    T: Clone + Send + 'static,
{
    /// Forward events published under `context` into an unbounded channel.
    ///
    /// The forwarding listener stays registered until `ignore_context` is
    /// called; events published after the receiver is dropped are discarded.
    pub fn subscribe(&self, context: ListenerContext) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listen(context, move |event: &T| {
            let _ = tx.send(event.clone());
        });
        rx
    }
}

impl<T> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_reaches_every_listener_in_order() {
        let stream = EventStream::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        stream.listen(ListenerContext::new(), move |value| {
            first.lock().unwrap().push(("first", *value))
        });
        let second = Arc::clone(&seen);
        stream.listen(ListenerContext::new(), move |value| {
            second.lock().unwrap().push(("second", *value))
        });

        stream.publish(&7);

        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_ignore_context_removes_only_that_subscriber() {
        let stream = EventStream::<()>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ui = ListenerContext::new();
        let sync = ListenerContext::new();

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            stream.listen(ui, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        let kept = Arc::clone(&calls);
        stream.listen(sync, move |_| {
            kept.fetch_add(100, Ordering::SeqCst);
        });

        assert_eq!(stream.ignore_context(ui), 2);
        assert_eq!(stream.listener_count(), 1);

        stream.publish(&());
        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_listener_may_unregister_during_publish() {
        let stream = Arc::new(EventStream::<u8>::new());
        let context = ListenerContext::new();

        let inner = Arc::clone(&stream);
        stream.listen(context, move |_| {
            inner.ignore_context(context);
        });

        stream.publish(&1);
        assert_eq!(stream.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_forwards_clones() {
        let stream = EventStream::<String>::new();
        let context = ListenerContext::new();
        let mut rx = stream.subscribe(context);

        stream.publish(&"unlocked".to_string());
        assert_eq!(rx.recv().await.as_deref(), Some("unlocked"));

        stream.ignore_context(context);
        stream.publish(&"ignored".to_string());
        assert!(rx.recv().await.is_none());
    }
}
