use std::sync::Arc;

use crate::error::Error;
use crate::error::Result;
use crate::registry::CacheRegistry;
use crate::traits::Preload;

/// A cache that couldn't be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub cache_name: String,
    pub error:      Error,
}

/// What [`CacheLoader::scan`] did, per cache name, in the order repositories were given.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Caches that got data.
    pub loaded: Vec<String>,
    /// Caches whose repository had nothing to load.
    pub empty:  Vec<String>,
    pub failed: Vec<LoadFailure>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Warms up the [`CacheRegistry`] at startup.
///
/// Every repository is loaded in its own task; a failing repository doesn't prevent the others from loading.
#[derive(Debug, Clone)]
pub struct CacheLoader {
    registry: Arc<CacheRegistry>,
}

impl CacheLoader {
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<CacheRegistry> {
        Arc::clone(&self.registry)
    }

    /// Load every repository's data into the registry under its cache name. Completes when all loads are done.
    ///
    /// A repository with nothing to load has its entry removed, so a rescan never leaves an outdated value behind. A
    /// failed load leaves the entry as it was.
    pub async fn scan<I>(&self, repositories: I) -> ScanReport
    where
        I: IntoIterator<Item = Arc<dyn Preload>>,
    {
        let handles = repositories
            .into_iter()
            .map(|repository| {
                let cache_name = repository.cache_name().to_string();
                let registry = Arc::clone(&self.registry);
                let handle = tokio::spawn(Self::load_one(registry, repository));
                (cache_name, handle)
            })
            .collect::<Vec<_>>();

        let mut report = ScanReport::default();
        for (cache_name, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|err| {
                Err(Error::LoaderTask {
                    cache_name: cache_name.clone(),
                    message:    err.to_string(),
                })
            });

            match outcome {
                Ok(true) => {
                    tracing::debug!("[{}] cache '{cache_name}' loaded", self.registry.name());
                    report.loaded.push(cache_name);
                }
                Ok(false) => {
                    tracing::debug!("[{}] nothing to load for cache '{cache_name}'", self.registry.name());
                    report.empty.push(cache_name);
                }
                Err(error) => {
                    tracing::warn!("[{}] {error}", self.registry.name());
                    report.failed.push(LoadFailure { cache_name, error });
                }
            }
        }

        tracing::info!(
            loaded = report.loaded.len(),
            empty = report.empty.len(),
            failed = report.failed.len(),
            "[{}] cache scan complete",
            self.registry.name()
        );
        report
    }

    async fn load_one(registry: Arc<CacheRegistry>, repository: Arc<dyn Preload>) -> Result<bool> {
        let Some(payload) = repository.load_payload().await?
        else {
            registry.remove(repository.cache_name()).await;
            return Ok(false);
        };
        registry.put_payload(repository.cache_name(), payload).await;
        Ok(true)
    }
}
