use parking_lot::Mutex;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::observable::Observable;
use crate::pager::DataPager;
use crate::traits::FetchCallback;
use crate::traits::LoggingCallback;

/// Identifies one fetch on a [`DataFetcher`].
///
/// Tickets are ordered: once a fetch has published, tickets issued before it can no longer publish. A cancelled
/// ticket never publishes.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    sequence: u64,
    token:    CancellationToken,
}

impl FetchTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the ticket gets cancelled, either directly or through [`DataFetcher::cancel_all`].
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Holds the current value of a repository and decides which fetch gets to publish into it.
pub struct DataFetcher<V> {
    slot:      Observable<V>,
    issued:    AtomicU64,
    // Sequence of the last published ticket. The lock also serializes publishing.
    published: Mutex<u64>,
    root:      Mutex<CancellationToken>,
    callback:  RwLock<Arc<dyn FetchCallback<V>>>,
}

/// A fetcher of list data.
pub type ListDataFetcher<T> = DataFetcher<Vec<T>>;

impl<V> DataFetcher<V>
where
    V: Debug + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let callback: Arc<dyn FetchCallback<V>> = Arc::new(LoggingCallback::<V>::default());
        Self {
            slot:      Observable::new(),
            issued:    AtomicU64::new(0),
            published: Mutex::new(0),
            root:      Mutex::new(CancellationToken::new()),
            callback:  RwLock::new(callback),
        }
    }

    /// Start a new fetch.
    pub fn begin(&self) -> FetchTicket {
        FetchTicket {
            sequence: self.issued.fetch_add(1, Ordering::AcqRel) + 1,
            token:    self.root.lock().child_token(),
        }
    }

    /// Publish `value` on behalf of `ticket`. Returns false if the ticket has been cancelled or superseded.
    pub fn publish(&self, ticket: &FetchTicket, value: V) -> bool {
        if ticket.is_cancelled() {
            tracing::debug!(sequence = ticket.sequence, "dropping value of a cancelled fetch");
            return false;
        }

        let mut published = self.published.lock();
        if ticket.sequence < *published {
            tracing::debug!(
                sequence = ticket.sequence,
                current = *published,
                "dropping stale value"
            );
            return false;
        }
        *published = ticket.sequence;
        self.slot.publish(value);
        true
    }

    /// True if `ticket` is not cancelled and no newer ticket has published yet.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        !ticket.is_cancelled() && ticket.sequence >= *self.published.lock()
    }

    /// Empty the slot on behalf of `ticket`, under the same rules as [`publish`](Self::publish).
    pub fn clear(&self, ticket: &FetchTicket) -> bool {
        if ticket.is_cancelled() {
            return false;
        }

        let mut published = self.published.lock();
        if ticket.sequence < *published {
            return false;
        }
        *published = ticket.sequence;
        self.slot.clear();
        true
    }

    /// Cancel every ticket issued so far.
    pub fn cancel_all(&self) {
        let previous = std::mem::replace(&mut *self.root.lock(), CancellationToken::new());
        previous.cancel();
    }

    pub fn data(&self) -> &Observable<V> {
        &self.slot
    }

    pub fn value(&self) -> Option<V> {
        self.slot.value()
    }

    pub fn callback(&self) -> Arc<dyn FetchCallback<V>> {
        Arc::clone(&*self.callback.read())
    }

    pub fn set_callback(&self, callback: Arc<dyn FetchCallback<V>>) {
        *self.callback.write() = callback;
    }
}

impl<T> DataFetcher<Vec<T>>
where
    T: Debug + Clone + Send + Sync + 'static,
{
    /// A pager over a snapshot of the current list. Take a new one after every fetch.
    pub fn pager(&self) -> DataPager<T> {
        DataPager::new(self.value().unwrap_or_default())
    }
}

impl<V> Default for DataFetcher<V>
where
    V: Debug + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for DataFetcher<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFetcher")
            .field("slot", &self.slot)
            .field("issued", &self.issued.load(Ordering::Relaxed))
            .field("published", &*self.published.lock())
            .finish()
    }
}
