use strum::Display;
use strum::EnumIter;
use strum::EnumString;

/// How a repository combines its data sources.
///
/// The strategy is fixed when a [`Repository`](crate::Repository) is constructed.
///
/// | Strategy | Local chain | Network |
/// | -------- | ----------- | ------- |
/// | `DatabaseOnly` | database | never |
/// | `MemoryOnly` | memory | never |
/// | `DatabaseFirst` | database, then memory if a cache name is set | when online |
/// | `MemoryFirst` | memory, then database | when online |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CacheStrategy {
    #[default]
    DatabaseOnly,
    MemoryOnly,
    DatabaseFirst,
    MemoryFirst,
}

/// A local source of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheType {
    Database,
    Memory,
}

/// Where a value came from. Reported to [`DataController::intercept`](crate::DataController::intercept).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DataOrigin {
    Network,
    Database,
    Memory,
}

impl From<CacheType> for DataOrigin {
    fn from(source: CacheType) -> Self {
        match source {
            CacheType::Database => DataOrigin::Database,
            CacheType::Memory => DataOrigin::Memory,
        }
    }
}

impl CacheStrategy {
    /// True for strategies that must have a cache name.
    #[inline]
    pub fn has_memory(&self) -> bool {
        matches!(self, CacheStrategy::MemoryOnly | CacheStrategy::MemoryFirst)
    }

    #[inline]
    pub fn uses_network(&self) -> bool {
        matches!(self, CacheStrategy::DatabaseFirst | CacheStrategy::MemoryFirst)
    }

    /// Local sources in the order they're consulted when the network is not the origin of truth.
    ///
    /// `with_memory` tells whether the registry may be consulted at all, i.e. whether the repository has a cache
    /// name.
    pub fn local_chain(&self, with_memory: bool) -> Vec<CacheType> {
        let chain: &[CacheType] = match self {
            CacheStrategy::DatabaseOnly => &[CacheType::Database],
            CacheStrategy::MemoryOnly => &[CacheType::Memory],
            CacheStrategy::DatabaseFirst => &[CacheType::Database, CacheType::Memory],
            CacheStrategy::MemoryFirst => &[CacheType::Memory, CacheType::Database],
        };
        chain
            .iter()
            .copied()
            .filter(|source| with_memory || *source != CacheType::Memory)
            .collect()
    }

    /// Local sources consulted to preload the slot before a network request. Data warmed up at launch time lives in
    /// memory, so it goes first then.
    pub fn preload_chain(&self, with_memory: bool, loaded_at_launch: bool) -> Vec<CacheType> {
        let mut chain = self.local_chain(with_memory);
        if loaded_at_launch && with_memory {
            chain.sort_by_key(|source| *source != CacheType::Memory);
        }
        chain
    }
}
