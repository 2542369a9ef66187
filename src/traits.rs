use async_trait::async_trait;
use std::any::Any;
use std::fmt::Debug;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Result;
use crate::strategy::DataOrigin;
use crate::types::ApiResponse;
use crate::types::Payload;

/// Type-erased value kept by the [`CacheRegistry`](crate::CacheRegistry).
pub type CachePayload = Arc<dyn Any + Send + Sync>;

// For types that are in charge of reading/writing the records a repository serves.
#[async_trait]
pub trait DataController: Sized + Send + Sync + 'static {
    /// What the repository serves. For list repositories this is a `Vec` of records.
    type Value: Payload;
    /// Request parameters; used both as the database criteria and the network request arguments.
    type Query: Debug + Send + Sync + 'static;
    type Error: Display + Debug + Send + Sync + 'static;

    async fn read_database(&self, query: &Self::Query) -> Result<Option<Self::Value>, Self::Error>;

    /// Replace whatever the query selects with `value`. Returns false if nothing was stored.
    async fn write_database(&self, query: &Self::Query, value: &Self::Value) -> Result<bool, Self::Error>;

    /// Errors returned here are transport-level failures. Everything the server said, including failing statuses,
    /// belongs to the response.
    async fn request_network(&self, query: &Self::Query) -> Result<ApiResponse<Self::Value>, Self::Error>;

    /// Remove whatever the query selects. Only called for repositories configured to
    /// [clear their data on network errors](crate::RepositoryConfig::clear_data_on_network_error).
    async fn delete_database(&self, _query: &Self::Query) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Cold-start hook called by the [`CacheLoader`](crate::CacheLoader). Its result is put into the registry under
    /// the repository's cache name.
    async fn load_data(&self) -> Result<Option<Self::Value>, Self::Error> {
        Ok(None)
    }

    /// Last chance to adjust a value before it's persisted or published.
    #[inline(always)]
    fn intercept(&self, _origin: DataOrigin, _value: &mut Self::Value) {}

    fn is_network_available(&self) -> bool {
        true
    }
}

/// Receives the outcome of network requests.
pub trait FetchCallback<V>: Send + Sync + 'static {
    fn on_success(&self, _data: &V) {}
    fn on_failure(&self, _code: i32, _message: &str) {}
}

/// The callback every fetcher starts with. Only logs.
pub struct LoggingCallback<V> {
    _value: PhantomData<fn(V)>,
}

impl<V> Default for LoggingCallback<V> {
    fn default() -> Self {
        Self { _value: PhantomData }
    }
}

impl<V> FetchCallback<V> for LoggingCallback<V>
where
    V: Debug + 'static,
{
    fn on_success(&self, data: &V) {
        tracing::debug!("network data received: {data:?}");
    }

    fn on_failure(&self, code: i32, message: &str) {
        tracing::warn!(code, "network request failed: {message}");
    }
}

/// Something the [`CacheLoader`](crate::CacheLoader) can warm up.
#[async_trait]
pub trait Preload: Send + Sync + 'static {
    fn cache_name(&self) -> &str;

    /// Produce the payload to store under [`cache_name`](Self::cache_name). `None` means there is nothing to cache.
    async fn load_payload(&self) -> Result<Option<CachePayload>>;
}
