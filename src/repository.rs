use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::config::RepositoryConfig;
use crate::error::Error;
use crate::error::NetworkFailure;
use crate::error::Result;
use crate::fetcher::DataFetcher;
use crate::fetcher::FetchTicket;
use crate::observable::Observable;
use crate::pager::DataPager;
use crate::registry::CacheRegistry;
use crate::strategy::CacheStrategy;
use crate::strategy::CacheType;
use crate::strategy::DataOrigin;
use crate::traits::CachePayload;
use crate::traits::DataController;
use crate::traits::FetchCallback;
use crate::traits::Preload;
use crate::types::Payload;

/// Serves data from network, database and memory according to its [`CacheStrategy`].
///
/// ```ignore
/// let registry = CacheRegistry::shared();
/// let repository = Repository::new(
///     RepositoryConfig::with_strategy(CacheStrategy::DatabaseFirst, "")?,
///     ArticleController::new(db, client),
///     registry,
/// )?;
///
/// let _subscription = repository.data().subscribe(|articles| render(articles));
/// repository.fetch(&ArticleQuery::latest()).await;
/// ```
///
/// With a network-backed strategy and connectivity, the network is the origin of truth. The local chain of the
/// strategy is used when offline, as a stale fallback when the network fails, and, with
/// [`preload_before_network`](RepositoryConfig::preload_before_network), to publish something before the network
/// answers.
pub struct Repository<DC>
where
    DC: DataController,
{
    config:     RepositoryConfig,
    controller: Arc<DC>,
    registry:   Arc<CacheRegistry>,
    fetcher:    DataFetcher<DC::Value>,
    // Serializes database access and publishing of this repository so a refresh is atomic for its readers.
    db_lock:    Mutex<()>,
}

impl<DC> Repository<DC>
where
    DC: DataController,
{
    pub fn new(config: RepositoryConfig, controller: DC, registry: Arc<CacheRegistry>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            controller: Arc::new(controller),
            registry,
            fetcher: DataFetcher::new(),
            db_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.config.strategy()
    }

    pub fn cache_name(&self) -> &str {
        self.config.cache_name()
    }

    pub fn controller(&self) -> Arc<DC> {
        Arc::clone(&self.controller)
    }

    pub fn registry(&self) -> Arc<CacheRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn fetcher(&self) -> &DataFetcher<DC::Value> {
        &self.fetcher
    }

    /// The observable slot the repository publishes into.
    pub fn data(&self) -> &Observable<DC::Value> {
        self.fetcher.data()
    }

    pub fn value(&self) -> Option<DC::Value> {
        self.fetcher.value()
    }

    pub fn callback(&self) -> Arc<dyn FetchCallback<DC::Value>> {
        self.fetcher.callback()
    }

    pub fn set_callback(&self, callback: Arc<dyn FetchCallback<DC::Value>>) {
        self.fetcher.set_callback(callback);
    }

    pub fn cancel_all(&self) {
        self.fetcher.cancel_all();
    }

    /// Fetch according to the strategy. Returns the value this fetch published, if any.
    ///
    /// Network failures are reported to the [callback](Self::callback); missing local data is not an error. A fetch
    /// overtaken by a newer one leaves no trace: it publishes nothing, stores nothing and reports nothing.
    pub async fn fetch(&self, query: &DC::Query) -> Option<DC::Value> {
        let ticket = self.fetcher.begin();
        self.fetch_with(query, &ticket).await
    }

    /// Same as [`fetch`](Self::fetch) but under a ticket obtained from [`fetcher().begin()`](DataFetcher::begin),
    /// so the caller can cancel it.
    #[instrument(level = "debug", skip_all, fields(cache = %self.cache_name(), strategy = %self.strategy(), sequence = ticket.sequence()))]
    pub async fn fetch_with(&self, query: &DC::Query, ticket: &FetchTicket) -> Option<DC::Value> {
        let strategy = self.strategy();

        if !strategy.uses_network() {
            return self.publish_local(query, ticket, &self.local_chain()).await;
        }

        if !self.controller.is_network_available() {
            tracing::debug!("network is unavailable, serving local data");
            return self.publish_local(query, ticket, &self.local_chain()).await;
        }

        let preloaded = if self.config.preload_before_network() {
            self.publish_local(query, ticket, &self.preload_chain()).await
        }
        else {
            None
        };

        let response = tokio::select! {
            biased;
            _ = ticket.cancelled() => {
                tracing::debug!("fetch cancelled while waiting for the network");
                return preloaded;
            }
            response = self.controller.request_network(query) => response,
        };

        let outcome = response
            .map_err(|err| NetworkFailure::transport(err.to_string()))
            .and_then(|response| response.into_payload());

        match outcome {
            Ok(value) => self.accept_network(query, ticket, value).await,
            Err(failure) => {
                if !self.fetcher.is_current(ticket) {
                    tracing::debug!(code = failure.code(), "superseded fetch failed, ignoring");
                    return preloaded;
                }
                tracing::warn!(code = failure.code(), "network fetch failed: {}", failure.message());
                self.fetcher.callback().on_failure(failure.code(), failure.message());
                if preloaded.is_some() {
                    // The preloaded value stays in the slot.
                    preloaded
                }
                else if self.config.clear_data_on_network_error() {
                    self.clear_data(query, ticket).await;
                    None
                }
                else {
                    self.publish_local(query, ticket, &self.local_chain()).await
                }
            }
        }
    }

    /// Run a fetch on the tokio runtime. Cancel the returned ticket to abandon it.
    pub fn spawn_fetch(self: &Arc<Self>, query: DC::Query) -> (FetchTicket, JoinHandle<Option<DC::Value>>) {
        let ticket = self.fetcher.begin();
        let repository = Arc::clone(self);
        let task_ticket = ticket.clone();
        let handle = tokio::spawn(async move { repository.fetch_with(&query, &task_ticket).await });
        (ticket, handle)
    }

    fn local_chain(&self) -> Vec<CacheType> {
        self.strategy().local_chain(self.config.has_cache_name())
    }

    fn preload_chain(&self) -> Vec<CacheType> {
        self.strategy()
            .preload_chain(self.config.has_cache_name(), self.config.cache_loaded_at_launch())
    }

    // Every publish of this repository happens under `db_lock`, so the ticket check below stays valid until the
    // value is in the slot.
    async fn accept_network(&self, query: &DC::Query, ticket: &FetchTicket, mut value: DC::Value) -> Option<DC::Value> {
        self.controller.intercept(DataOrigin::Network, &mut value);

        {
            let _guard = self.db_lock.lock().await;
            if !self.fetcher.is_current(ticket) {
                tracing::debug!("[{}] network data is superseded, dropping it", self.cache_name());
                return None;
            }

            self.persist(query, &value).await;
            if self.strategy() == CacheStrategy::MemoryFirst {
                self.registry.put(self.cache_name(), value.clone()).await;
            }

            if !self.fetcher.publish(ticket, value.clone()) {
                return None;
            }
        }

        self.fetcher.callback().on_success(&value);
        Some(value)
    }

    async fn clear_data(&self, query: &DC::Query, ticket: &FetchTicket) {
        let _guard = self.db_lock.lock().await;
        if !self.fetcher.is_current(ticket) {
            return;
        }

        tracing::debug!("[{}] clearing data after a network error", self.cache_name());
        if self.config.has_cache_name() {
            self.registry.remove(self.cache_name()).await;
        }
        if let Err(err) = self.controller.delete_database(query).await {
            tracing::error!("[{}] failed to delete database data: {err}", self.cache_name());
        }
        self.fetcher.clear(ticket);
    }

    // Callers hold `db_lock`.
    async fn persist(&self, query: &DC::Query, value: &DC::Value) {
        match self.controller.write_database(query, value).await {
            Ok(true) => (),
            Ok(false) => tracing::warn!("[{}] database refused the network data", self.cache_name()),
            Err(err) => tracing::error!("[{}] failed to store network data: {err}", self.cache_name()),
        }
    }

    async fn read_source(&self, query: &DC::Query, source: CacheType) -> Option<DC::Value> {
        match source {
            CacheType::Memory => self.registry.get::<DC::Value>(self.cache_name()).await,
            CacheType::Database => self
                .controller
                .read_database(query)
                .await
                .inspect_err(|err| tracing::warn!("[{}] database read failed: {err}", self.cache_name()))
                .ok()
                .flatten(),
        }
    }

    async fn read_local(&self, query: &DC::Query, chain: &[CacheType]) -> Option<(CacheType, DC::Value)> {
        for source in chain {
            match self.read_source(query, *source).await {
                Some(value) if !value.is_blank() => return Some((*source, value)),
                _ => tracing::trace!("nothing in {source}"),
            }
        }
        None
    }

    async fn publish_local(&self, query: &DC::Query, ticket: &FetchTicket, chain: &[CacheType]) -> Option<DC::Value> {
        let _guard = self.db_lock.lock().await;
        let (source, mut value) = self.read_local(query, chain).await?;
        self.controller.intercept(source.into(), &mut value);
        if !self.fetcher.publish(ticket, value.clone()) {
            tracing::debug!("[{}] local data is superseded, dropping it", self.cache_name());
            return None;
        }
        tracing::debug!("serving data from {source}");
        Some(value)
    }
}

impl<DC, T> Repository<DC>
where
    DC: DataController<Value = Vec<T>>,
    T: Debug + Clone + Send + Sync + 'static,
{
    /// A pager over the current list. Take a new one after every fetch.
    pub fn pager(&self) -> DataPager<T> {
        self.fetcher.pager()
    }
}

#[async_trait]
impl<DC> Preload for Repository<DC>
where
    DC: DataController,
{
    fn cache_name(&self) -> &str {
        self.config.cache_name()
    }

    async fn load_payload(&self) -> Result<Option<CachePayload>> {
        if !self.config.has_cache_name() {
            return Err(Error::MissingCacheName {
                strategy: self.strategy(),
            });
        }

        let loaded = self.controller.load_data().await.map_err(|err| Error::Load {
            cache_name: self.cache_name().to_string(),
            message:    err.to_string(),
        })?;

        Ok(loaded.filter(|value| !value.is_blank()).map(|mut value| {
            self.controller.intercept(DataOrigin::Memory, &mut value);
            Arc::new(value) as CachePayload
        }))
    }
}

impl<DC> Debug for Repository<DC>
where
    DC: DataController,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}
