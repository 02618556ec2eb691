//! Strategy Engine
//!
//! Classifies intercepted requests and runs the matching strategy against the
//! live partitions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use super::{cache_first, network_first, stale_revalidate};
use super::{Classifier, RequestClass, Served, Strategy};
use crate::cache::{PartitionManager, PartitionSet, StrategyStats};
use crate::config::Config;
use crate::error::{CacheError, FetchError, Result};
use crate::net::{Fetcher, InterceptedRequest, RequestKey, StoredResponse};
use crate::sync::SyncContext;

/// Outcome at the interception boundary.
#[derive(Debug)]
pub enum Interception {
    /// The caching core answered
    Respond(Served),
    /// Not HTTP(S): the request must go out untouched
    PassThrough(InterceptedRequest),
}

pub struct StrategyEngine {
    pub(super) partitions: PartitionSet,
    pub(super) manager: Arc<PartitionManager>,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) context: Arc<SyncContext>,
    classifier: Classifier,
    network_timeout: Duration,
    root_key: RequestKey,
    stats: RwLock<StrategyStats>,
}

impl StrategyEngine {
    pub fn new(
        config: &Config,
        manager: Arc<PartitionManager>,
        partitions: PartitionSet,
        fetcher: Arc<dyn Fetcher>,
        context: Arc<SyncContext>,
    ) -> Result<Self> {
        let root = Url::parse(&config.app_origin)
            .and_then(|origin| origin.join("/"))
            .map_err(|e| CacheError::InvalidRequest(format!("Invalid app origin: {}", e)))?;

        Ok(Self {
            partitions,
            manager,
            fetcher,
            context,
            classifier: Classifier::from_config(config),
            network_timeout: Duration::from_millis(config.network_timeout_ms),
            root_key: RequestKey::new("GET", root.as_str()),
            stats: RwLock::new(StrategyStats::new()),
        })
    }

    // == Intercept ==
    /// Entry point for every outgoing request.
    ///
    /// Non-HTTP(S) requests are handed back unmodified; everything else is
    /// classified and answered by its strategy.
    pub async fn intercept(self: &Arc<Self>, request: InterceptedRequest) -> Interception {
        if !request.is_http() {
            debug!("Passing through {} request {}", request.url.scheme(), request.url);
            self.stats.write().await.record_pass_through();
            return Interception::PassThrough(request);
        }

        let class = self.classify(&request.url);
        let strategy = Strategy::for_class(class);
        debug!("{} {} -> {:?} / {:?}", request.method, request.url, class, strategy);

        Interception::Respond(self.execute(strategy, request).await)
    }

    /// Runs one strategy for `request`.
    pub async fn execute(self: &Arc<Self>, strategy: Strategy, request: InterceptedRequest) -> Served {
        let served = match strategy {
            Strategy::CacheFirst => cache_first::run(self, request).await,
            Strategy::NetworkFirst => network_first::run(self, request).await,
            Strategy::StaleWhileRevalidate => stale_revalidate::run(self, request).await,
        };
        self.stats.write().await.record_served(served.source);
        served
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        self.classifier.classify(url)
    }

    pub async fn stats(&self) -> StrategyStats {
        self.stats.read().await.clone()
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.context
    }

    // == Shared Strategy Steps ==
    /// Feeds a network outcome into the connectivity flag.
    pub(super) fn observe_network(&self, reachable: bool) {
        self.context.connectivity().set_online(reachable);
    }

    /// Queues a failed request for replay.
    pub(super) async fn enqueue(&self, request: &InterceptedRequest) {
        self.context.queue().enqueue(request).await;
        self.stats.write().await.record_enqueue();
    }

    /// Network call raced against the configured timeout.
    ///
    /// The fetch runs as its own task, so losing the race does not cancel it;
    /// its eventual result is simply dropped.
    pub(super) async fn fetch_with_timeout(
        &self,
        request: &InterceptedRequest,
    ) -> std::result::Result<StoredResponse, FetchError> {
        let fetcher = self.fetcher.clone();
        let owned = request.clone();
        let network = tokio::spawn(async move { fetcher.fetch(&owned).await });

        match tokio::time::timeout(self.network_timeout, network).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(FetchError::Network(join_err.to_string())),
            Err(_) => Err(FetchError::Timeout(self.network_timeout.as_millis() as u64)),
        }
    }

    /// Any cached response for `key`, else the cached root page.
    pub(super) async fn cached_or_root(&self, key: &RequestKey) -> Option<StoredResponse> {
        match self.manager.match_any(key).await {
            Some(cached) => Some(cached),
            None => self.cached_root().await,
        }
    }

    pub(super) async fn cached_root(&self) -> Option<StoredResponse> {
        self.manager.match_any(&self.root_key).await
    }
}
