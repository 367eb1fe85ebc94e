#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Process-wide "report set changed" notification.
//!
//! Map views, the report list, and the submission forms never talk to each
//! other directly. After a successful create or status update the acting
//! component calls [`ChangeNotifier::publish`]; every subscriber then
//! re-fetches on its own. The notification carries no payload, so
//! subscribers only agree on *that* something changed, never on *what*.
//!
//! Delivery is in-process only. [`ChangeNotifier::publish`] runs all
//! handlers and resolves once every one of them has finished.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt as _, join_all};

/// Name of the notification, used in log output.
pub const REPORT_SET_CHANGED: &str = "report-set-changed";

type Handler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

/// Cloneable handle to a shared set of change handlers.
///
/// Clones share the same subscriber set, so one notifier can be handed to
/// every component that publishes or listens.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ChangeNotifier {
    /// Creates a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to run on every [`publish`](Self::publish).
    pub fn subscribe<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler = Arc::new(move || handler().boxed());
        self.handlers().insert(id, handler);
        log::debug!("Subscribed handler {id} to {REPORT_SET_CHANGED}");
        SubscriptionId(id)
    }

    /// Removes a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers().remove(&id.0).is_some();
        if removed {
            log::debug!("Unsubscribed handler {} from {REPORT_SET_CHANGED}", id.0);
        }
        removed
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers().len()
    }

    /// Notifies every subscriber and waits until all handlers complete.
    ///
    /// Handlers run concurrently with each other. Handlers registered while
    /// a publish is in flight are not called for that publish. Returns the
    /// number of handlers notified.
    pub async fn publish(&self) -> usize {
        let handlers: Vec<Handler> = self.handlers().values().cloned().collect();
        let count = handlers.len();

        log::debug!("Publishing {REPORT_SET_CHANGED} to {count} subscriber(s)");

        join_all(handlers.iter().map(|handler| handler())).await;
        count
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Handler>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_handler(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn() -> futures::future::Ready<()> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let notifier = ChangeNotifier::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        notifier.subscribe(counter_handler(&a));
        notifier.subscribe(counter_handler(&b));

        assert_eq!(notifier.publish().await, 2);
        assert_eq!(notifier.publish().await, 2);

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribed_handlers_are_not_called() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let id = notifier.subscribe(counter_handler(&hits));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));

        assert_eq!(notifier.publish().await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clones_share_subscribers() {
        let notifier = ChangeNotifier::new();
        let publisher = notifier.clone();
        let hits = Arc::new(AtomicUsize::new(0));

        notifier.subscribe(counter_handler(&hits));
        assert_eq!(publisher.subscriber_count(), 1);

        publisher.publish().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_waits_for_async_handlers() {
        let notifier = ChangeNotifier::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        notifier.subscribe(move || {
            let tx = tx.clone();
            async move {
                tokio::task::yield_now().await;
                let _ = tx.send("refreshed");
            }
        });

        notifier.publish().await;
        assert_eq!(rx.try_recv().ok(), Some("refreshed"));
    }
}
