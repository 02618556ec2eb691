//! Cache-first with background refresh, used for static assets.

use std::sync::Arc;

use tracing::debug;

use super::{Served, StrategyEngine};
use crate::fallback::json_fallback;
use crate::net::InterceptedRequest;

pub(super) async fn run(engine: &Arc<StrategyEngine>, request: InterceptedRequest) -> Served {
    let key = request.key();

    if let Some(cached) = engine.partitions.static_assets.lookup(&key).await {
        debug!("Static hit for {}", key);
        spawn_refresh(engine.clone(), request);
        return Served::cache(cached);
    }

    match engine.fetcher.fetch(&request).await {
        Ok(response) => {
            engine.observe_network(true);
            if response.is_ok() {
                engine.partitions.static_assets.store(&request, &response).await;
            }
            Served::network(response)
        }
        Err(err) => {
            debug!("Static fetch for {} failed: {}", key, err);
            engine.observe_network(false);
            match engine.cached_or_root(&key).await {
                Some(cached) => Served::cache(cached),
                None => Served::fallback(json_fallback()),
            }
        }
    }
}

/// Detached refresh of a cached entry; the caller never waits on it.
fn spawn_refresh(engine: Arc<StrategyEngine>, request: InterceptedRequest) {
    tokio::spawn(async move {
        match engine.fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                engine.observe_network(true);
                engine.partitions.static_assets.store(&request, &response).await;
            }
            Ok(response) => {
                engine.observe_network(true);
                debug!("Refresh of {} returned {}", request.url, response.status);
            }
            Err(err) => debug!("Refresh of {} failed: {}", request.url, err),
        }
    });
}
