//! Stale-while-revalidate with offline page, used for app pages.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::{Served, StrategyEngine};
use crate::fallback::html_fallback;
use crate::net::{InterceptedRequest, StoredResponse};

pub(super) async fn run(engine: &Arc<StrategyEngine>, request: InterceptedRequest) -> Served {
    let key = request.key();
    let cached = match engine.partitions.dynamic.lookup(&key).await {
        Some(hit) => Some(hit),
        None => engine.manager.match_any(&key).await,
    };

    let revalidation = spawn_revalidate(engine.clone(), request);

    if let Some(cached) = cached {
        return Served::cache(cached);
    }

    match revalidation.await {
        Ok(Some(response)) => Served::network(response),
        Ok(None) => Served::fallback(html_fallback()),
        Err(err) => {
            debug!("Revalidation task for {} aborted: {}", key, err);
            Served::fallback(html_fallback())
        }
    }
}

/// Starts the network fetch for a page; its result only reaches the caller
/// when nothing was cached.
fn spawn_revalidate(
    engine: Arc<StrategyEngine>,
    request: InterceptedRequest,
) -> JoinHandle<Option<StoredResponse>> {
    tokio::spawn(async move {
        match engine.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_ok() {
                    engine.partitions.dynamic.store(&request, &response).await;
                }
                engine.observe_network(true);
                Some(response)
            }
            Err(err) => {
                debug!("Revalidation of {} failed: {}", request.url, err);
                engine.observe_network(false);
                engine.enqueue(&request).await;
                None
            }
        }
    })
}
