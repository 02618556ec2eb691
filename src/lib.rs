//! Offline Sync - an offline caching proxy with background reconciliation
//!
//! Classifies every intercepted request, serves it with a cache-first,
//! network-first or stale-while-revalidate strategy over versioned cache
//! partitions, queues failed requests for replay, and reconciles app data in
//! the background when connectivity returns.

pub mod api;
pub mod app;
pub mod broadcast;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod fallback;
pub mod models;
pub mod net;
pub mod strategy;
pub mod sync;
pub mod tasks;

pub use api::{create_router, AppState};
pub use app::{Activation, App, InstallReport};
pub use config::Config;
pub use error::{CacheError, FetchError, Result};
pub use net::{Fetcher, HttpFetcher, InterceptedRequest, StoredResponse};
