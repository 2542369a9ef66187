use fieldx::fxstruct;

use crate::error::Error;
use crate::error::Result;
use crate::strategy::CacheStrategy;

/// Declares how a [`Repository`](crate::Repository) sources its data.
///
/// ```ignore
/// let config = RepositoryConfig::builder()
///     .strategy(CacheStrategy::MemoryFirst)
///     .cache_name("articles")
///     .cache_loaded_at_launch(true)
///     .preload_before_network(true)
///     .build()?;
/// ```
#[fxstruct(
    no_new,
    builder(
        doc("Builder object of [`RepositoryConfig`].", "", "See [`RepositoryConfig::builder()`] method."),
        method_doc("Implement builder pattern for [`RepositoryConfig`]."),
    )
)]
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    #[fieldx(get(copy), builder(required))]
    strategy: CacheStrategy,

    /// Registry key of the repository's in-memory data. Required by memory strategies.
    #[fieldx(get(off), builder(into), default(String::new()))]
    cache_name: String,

    /// The [`CacheLoader`](crate::CacheLoader) puts this repository's data into memory at startup.
    #[fieldx(get(copy), default(false))]
    cache_loaded_at_launch: bool,

    /// Publish cached data before asking the network.
    #[fieldx(get(copy), default(false))]
    preload_before_network: bool,

    /// On a network failure, drop this repository's data everywhere instead of serving the local copy. Has no effect
    /// when a preloaded value has already been published by the failing fetch.
    #[fieldx(get(copy), default(false))]
    clear_data_on_network_error: bool,
}

impl RepositoryConfig {
    /// Shortcut for a configuration with only the strategy and the cache name set.
    pub fn with_strategy(strategy: CacheStrategy, cache_name: impl Into<String>) -> Result<Self> {
        Self::builder()
            .strategy(strategy)
            .cache_name(cache_name)
            .build()
            .map_err(|err| Error::Config(err.to_string()))
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn has_cache_name(&self) -> bool {
        !self.cache_name.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.strategy.has_memory() && !self.has_cache_name() {
            return Err(Error::MissingCacheName {
                strategy: self.strategy,
            });
        }
        Ok(())
    }
}
