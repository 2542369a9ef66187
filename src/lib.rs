//! # strata-cache
//!
//! Cache-strategy repositories: serve records from the network, a local database and an in-memory cache, combined
//! the way the repository declares.
//!
//! # The Basics
//!
//! The crate is designed for the following use case:
//!
//! - The data lives on a remote service and has to be requested over an unreliable network.
//! - A local database keeps the last copy of it, so the application keeps working offline.
//! - Some data is hot enough to be kept in memory for the lifetime of the process.
//! - Consumers want to be notified when the data changes rather than poll for it.
//!
//! The repository operates on the following principles:
//!
//! - It is storage and transport agnostic: both are behind the [`DataController`] trait.
//! - It is value agnostic: anything implementing [`Payload`] can be served.
//! - Results are published into an [`Observable`] slot owned by the repository's [`DataFetcher`].
//! - Every fetch holds a [`FetchTicket`]; a fetch that has been superseded or cancelled can't overwrite newer data.
//! - Fully async.
//!
//! # Strategies
//!
//! | Strategy | Network | Local chain |
//! | -------- | ------- | ----------- |
//! | [`DatabaseOnly`](CacheStrategy::DatabaseOnly) | never | database |
//! | [`MemoryOnly`](CacheStrategy::MemoryOnly) | never | memory |
//! | [`DatabaseFirst`](CacheStrategy::DatabaseFirst) | yes | database, then memory if the repository has a cache name |
//! | [`MemoryFirst`](CacheStrategy::MemoryFirst) | yes | memory, then database |
//!
//! For network strategies the network is the origin of truth whenever it can be reached. The local chain is served
//! when the controller reports no connectivity and as a stale fallback when the network fails. With
//! [`preload_before_network`](RepositoryConfig::preload_before_network) set, the local data is published first and
//! replaced by the network data once it arrives.
//!
//! Network data is stored into the database before it's published. `MemoryFirst` repositories refresh their
//! registry entry too.
//!
//! # Data Controller
//!
//! Similar to a database driver, the [`DataController`] is the piece that knows where the data actually comes from.
//! Through its associated types it defines the `Value` the repository serves, the `Query` that selects it and the
//! `Error` its backends report. Besides the database and network operations it can provide the cold-start data for
//! the [`CacheLoader`], adjust every value before it's stored or published, and tell if the network is reachable.
//!
//! # Paging
//!
//! List repositories serve a `Vec`. [`Repository::pager`] gives a [`DataPager`] over a snapshot of the current list;
//! the page itself is cut by a [`PageDataVisitor`], [`DefaultPageDataVisitor`] unless told otherwise.
//!
//! # Crate Features
//!
//! - `tracing` – brings in `tracing-subscriber` for `test::init_tracing` and enables all tracing levels.
//! - `log` – forward tracing events to the `log` facade.
//! - `serde` – derive serialization for [`ApiResult`].
//! - `test` – the `test` module with in-memory collaborators.
//! - `demo` – what the `catalog` demo needs.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod observable;
pub mod pager;
pub mod registry;
pub mod repository;
pub mod strategy;
pub mod traits;
pub mod types;
pub mod visitor;

#[doc(inline)]
pub use config::RepositoryConfig;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use error::NetworkFailure;
#[doc(inline)]
pub use error::Result;
#[doc(inline)]
pub use fetcher::DataFetcher;
#[doc(inline)]
pub use fetcher::FetchTicket;
#[doc(inline)]
pub use fetcher::ListDataFetcher;
#[doc(inline)]
pub use loader::CacheLoader;
#[doc(inline)]
pub use loader::ScanReport;
#[doc(inline)]
pub use observable::Observable;
#[doc(inline)]
pub use observable::Subscription;
#[doc(inline)]
pub use pager::DataPager;
#[doc(inline)]
pub use registry::CacheRegistry;
#[doc(inline)]
pub use repository::Repository;
#[doc(inline)]
pub use strategy::CacheStrategy;
#[doc(inline)]
pub use traits::DataController;
#[doc(inline)]
pub use traits::FetchCallback;
#[doc(inline)]
pub use traits::Preload;
#[doc(inline)]
pub use types::ApiResponse;
#[doc(inline)]
pub use types::ApiResult;
#[doc(inline)]
pub use types::Payload;
#[doc(inline)]
pub use visitor::DefaultPageDataVisitor;
#[doc(inline)]
pub use visitor::PageDataVisitor;

pub mod prelude {
    pub use crate::config::RepositoryConfig;
    pub use crate::error::NetworkFailure;
    pub use crate::loader::CacheLoader;
    pub use crate::pager::DataPager;
    pub use crate::registry::CacheRegistry;
    pub use crate::repository::Repository;
    pub use crate::strategy::*;
    pub use crate::traits::*;
    pub use crate::types::*;
    pub use crate::visitor::*;
}
