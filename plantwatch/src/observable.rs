//! Publish/subscribe with a last-known value.
//!
//! A [`Publisher`] keeps a list of listeners plus the most recently published
//! value. New subscribers are primed with that value, then receive every
//! later publication in order. Each listener has its own unbounded channel,
//! so a slow observer never causes another observer to miss a value.
//!
//! # Example
//!
//! ```
//! use plantwatch::observable::Publisher;
//!
//! let publisher = Publisher::new();
//! publisher.publish(1);
//!
//! let mut subscription = publisher.subscribe();
//! publisher.publish(2);
//!
//! assert_eq!(subscription.try_recv(), Some(1));
//! assert_eq!(subscription.try_recv(), Some(2));
//! assert_eq!(subscription.try_recv(), None);
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

struct PublisherInner<T> {
    latest: Option<T>,
    listeners: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone> PublisherInner<T> {
    fn deliver(&mut self, value: T) {
        // Closed listeners (dropped subscriptions) fall out here.
        self.listeners.retain(|tx| tx.send(value.clone()).is_ok());
        self.latest = Some(value);
    }
}

/// Shared publisher handle. Clones publish to the same listeners.
pub struct Publisher<T> {
    inner: Arc<Mutex<PublisherInner<T>>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Publisher")
            .field("latest", &inner.latest)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<T: Clone + Send + 'static> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Publisher<T> {
    /// Create a publisher with no value yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PublisherInner {
                latest: None,
                listeners: Vec::new(),
            })),
        }
    }

    /// Create a publisher whose last-known value is `initial`.
    pub fn with_initial(initial: T) -> Self {
        let publisher = Self::new();
        publisher.inner.lock().latest = Some(initial);
        publisher
    }

    /// Store `value` as the latest value and send it to every listener.
    pub fn publish(&self, value: T) {
        self.inner.lock().deliver(value);
    }

    /// Atomically derive the next value from the current one.
    ///
    /// `f` sees the latest value and returns the value to publish, or `None`
    /// to leave everything unchanged. Returns true if a value was published.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let mut inner = self.inner.lock();
        match f(inner.latest.as_ref()) {
            Some(next) => {
                inner.deliver(next);
                true
            }
            None => false,
        }
    }

    /// Forget the latest value without notifying anyone.
    pub fn clear(&self) {
        self.inner.lock().latest = None;
    }

    /// The most recently published value.
    pub fn latest(&self) -> Option<T> {
        self.inner.lock().latest.clone()
    }

    /// Attach a listener, primed with the latest value if there is one.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if let Some(latest) = &inner.latest {
            // Cannot fail: we hold the receiver.
            let _ = tx.send(latest.clone());
        }
        inner.listeners.push(tx);
        Subscription { rx }
    }

    /// Number of live listeners.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.listeners.retain(|tx| !tx.is_closed());
        inner.listeners.len()
    }
}

/// A listener attached to a [`Publisher`].
///
/// Yields values in publication order. The stream ends once every clone of
/// the publisher has been dropped. Dropping the subscription detaches it.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl<T> Subscription<T> {
    /// Wait for the next value. Returns `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued value without waiting.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
