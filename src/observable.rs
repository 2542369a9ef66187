//! A value holder that fans every new value out to its observers.
//!
//! Observers registered with [`Observable::subscribe`] are called synchronously from [`Observable::publish`], and get
//! the current value replayed right away if there is one. Async consumers can use [`Observable::watch`] or
//! [`Observable::stream`] instead; both always start from the latest value.
//!
//! Observers must not subscribe to, or publish into, the same observable from within their callback.

use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type ObserverFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ObserverList<T> = RwLock<Vec<(u64, ObserverFn<T>)>>;

pub struct Observable<T> {
    sender:    watch::Sender<Option<T>>,
    observers: Arc<ObserverList<T>>,
    next_id:   AtomicU64,
    published: AtomicU64,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            observers: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, value: T) {
        // The value is replaced under the list lock so a new subscriber gets it either by replay or by notification,
        // never both. The list is cloned so an observer dropping its own subscription doesn't deadlock.
        let observers = {
            let observers = self.observers.read();
            self.sender.send_replace(Some(value.clone()));
            self.published.fetch_add(1, Ordering::AcqRel);
            observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect::<Vec<_>>()
        };
        for observer in observers {
            observer(&value);
        }
    }

    /// Drop the current value. Closure observers aren't called; [`watch`](Self::watch) receivers see `None`.
    pub fn clear(&self) {
        self.sender.send_replace(None);
    }

    pub fn value(&self) -> Option<T> {
        self.sender.borrow().clone()
    }

    pub fn has_value(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// How many times a value has been published.
    pub fn publish_count(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let observer: ObserverFn<T> = Arc::new(observer);

        // Replay under the write lock so a concurrent publish can't slip in between the replay and the registration.
        let mut observers = self.observers.write();
        if let Some(current) = self.value() {
            observer(&current);
        }
        observers.push((id, observer));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.sender.subscribe()
    }

    pub fn stream(&self) -> WatchStream<Option<T>> {
        WatchStream::new(self.watch())
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Observable<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.sender.borrow())
            .field("published", &self.published.load(Ordering::Relaxed))
            .finish()
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes the observer"]
pub struct Subscription<T> {
    id:        u64,
    observers: Weak<ObserverList<T>>,
}

impl<T> Subscription<T> {
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T> Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
