use fieldx::fxstruct;
use moka::future::Cache;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::traits::CachePayload;

/// The process-scoped in-memory cache shared by repositories and the [`CacheLoader`](crate::CacheLoader).
///
/// Keys are cache names; values are whatever the owning repository serves. Writes to a key never block readers of
/// other keys. There is no expiration: an entry lives until it is overwritten, removed, evicted by capacity, or the
/// registry is cleared.
///
/// ```ignore
/// let registry = Arc::new(CacheRegistry::builder().name("app").max_capacity(1_000).build()?);
/// registry.put("articles", articles).await;
/// let articles: Option<Vec<Article>> = registry.get("articles").await;
/// ```
#[fxstruct(
    sync,
    no_new,
    builder(
        doc("Builder object of [`CacheRegistry`].", "", "See [`CacheRegistry::builder()`] method."),
        method_doc("Implement builder pattern for [`CacheRegistry`]."),
    )
)]
pub struct CacheRegistry {
    /// Registry name. Most useful for debugging and logging.
    #[fieldx(get(clone), builder(into), default(String::from("strata")))]
    name: String,

    /// Most entries the registry keeps. Past it, moka evicts the least valuable ones, which then read as absent.
    #[fieldx(get(copy), default(10_000))]
    max_capacity: u64,

    #[fieldx(vis(pub(crate)), lazy, get(clone), builder(off))]
    entries: Arc<Cache<String, CachePayload>>,
}

impl CacheRegistry {
    fn build_entries(&self) -> Arc<Cache<String, CachePayload>> {
        Arc::new(
            Cache::builder()
                .max_capacity(self.max_capacity())
                .name(&self.name())
                .build(),
        )
    }

    /// A registry with default settings.
    pub fn shared() -> Arc<Self> {
        Arc::new(
            Self::builder()
                .build()
                .unwrap_or_else(|_| unreachable!("all registry fields have defaults")),
        )
    }

    /// Typed read. A payload of another type reads as absent.
    pub async fn get<V>(&self, cache_name: &str) -> Option<V>
    where
        V: Any + Clone + Send + Sync,
    {
        let payload = self.entries().get(cache_name).await?;
        let value = payload.downcast_ref::<V>().cloned();
        if value.is_none() {
            tracing::warn!(
                "[{}] cache '{cache_name}' doesn't hold a {}",
                self.name(),
                std::any::type_name::<V>()
            );
        }
        value
    }

    pub async fn put<V>(&self, cache_name: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.put_payload(cache_name, Arc::new(value)).await
    }

    pub async fn put_payload(&self, cache_name: impl Into<String>, payload: CachePayload) {
        let cache_name = cache_name.into();
        tracing::debug!("[{}] PUT({cache_name})", self.name());
        self.entries().insert(cache_name, payload).await;
    }

    pub async fn remove(&self, cache_name: &str) -> bool {
        self.entries().remove(cache_name).await.is_some()
    }

    pub fn contains(&self, cache_name: &str) -> bool {
        self.entries().contains_key(cache_name)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let entries = self.entries();
        entries.invalidate_all();
        entries.run_pending_tasks().await;
    }

    pub async fn len(&self) -> u64 {
        let entries = self.entries();
        entries.run_pending_tasks().await;
        entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("name", &self.name())
            .field("max_capacity", &self.max_capacity())
            .finish()
    }
}
