//! Network-first with timeout and fallback, used for API data and anything
//! unclassified.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Served, StrategyEngine};
use crate::fallback::{html_fallback, json_fallback};
use crate::net::InterceptedRequest;

pub(super) async fn run(engine: &Arc<StrategyEngine>, request: InterceptedRequest) -> Served {
    match engine.fetch_with_timeout(&request).await {
        Ok(response) => {
            engine.observe_network(true);
            if response.is_ok() {
                engine.partitions.data.store(&request, &response).await;
                let reconciled = engine.context.queue().remove(request.url.as_str()).await;
                if reconciled > 0 {
                    debug!("Reconciled {} queued request(s) for {}", reconciled, request.url);
                }
            }
            Served::network(response)
        }
        Err(err) => {
            warn!("Network request for {} failed: {}", request.url, err);
            engine.observe_network(false);
            engine.enqueue(&request).await;
            fallback(engine, &request).await
        }
    }
}

async fn fallback(engine: &StrategyEngine, request: &InterceptedRequest) -> Served {
    if let Some(cached) = engine.manager.match_any(&request.key()).await {
        return Served::cache(cached);
    }
    if request.is_navigation() {
        return match engine.cached_root().await {
            Some(root) => Served::cache(root),
            None => Served::fallback(html_fallback()),
        };
    }
    Served::fallback(json_fallback())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::net::testing::{Script, ScriptedFetcher};
    use crate::net::{InterceptedRequest, RequestKey, StoredResponse};
    use crate::strategy::testing::{fixture, url};
    use crate::strategy::{ResponseSource, Strategy};

    const TIMINGS: &str = "/api/timings?latitude=21.42&longitude=39.83";

    #[tokio::test]
    async fn test_success_stores_in_data_and_reconciles_queue() {
        let fetcher = ScriptedFetcher::new().ok(&url(TIMINGS), r#"{"data":{}}"#);
        let fx = fixture(fetcher).await;
        let request = InterceptedRequest::get(&url(TIMINGS)).unwrap();
        fx.context.queue().enqueue(&request).await;
        fx.context
            .queue()
            .enqueue(&InterceptedRequest::get(&url("/api/other")).unwrap())
            .await;

        let served = fx.engine.execute(Strategy::NetworkFirst, request).await;

        assert_eq!(served.source, ResponseSource::Network);
        let stored = fx
            .partitions
            .data
            .lookup(&RequestKey::new("GET", &url(TIMINGS)))
            .await
            .unwrap();
        assert_eq!(stored.text(), r#"{"data":{}}"#);
        let remaining = fx.context.queue().items().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, url("/api/other"));
    }

    #[tokio::test]
    async fn test_error_status_is_not_stored() {
        let fetcher = ScriptedFetcher::new()
            .respond(&url("/api/broken"), StoredResponse::new(500, "oops"));
        let fx = fixture(fetcher).await;

        let served = fx
            .engine
            .execute(
                Strategy::NetworkFirst,
                InterceptedRequest::get(&url("/api/broken")).unwrap(),
            )
            .await;

        assert_eq!(served.response.status, 500);
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(fx.partitions.data.len().await.unwrap(), 0);
        assert!(fx.context.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_fetch_times_out_after_exactly_five_seconds() {
        let fetcher = ScriptedFetcher::new().hang(&url(TIMINGS));
        let fx = fixture(fetcher).await;

        let started = tokio::time::Instant::now();
        let served = fx
            .engine
            .execute(
                Strategy::NetworkFirst,
                InterceptedRequest::get(&url(TIMINGS)).unwrap(),
            )
            .await;

        assert_eq!(started.elapsed(), Duration::from_millis(5000));
        assert_eq!(served.source, ResponseSource::Fallback);
        assert_eq!(served.response.status, 503);
        assert_eq!(fx.context.queue().len().await, 1);
        assert!(!fx.context.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_discarded() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set(
            &url(TIMINGS),
            Script::Delayed(Duration::from_secs(8), StoredResponse::new(200, "late")),
        );
        let fx = fixture(fetcher).await;

        let served = fx
            .engine
            .execute(
                Strategy::NetworkFirst,
                InterceptedRequest::get(&url(TIMINGS)).unwrap(),
            )
            .await;
        assert_eq!(served.source, ResponseSource::Fallback);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fx
            .partitions
            .data
            .lookup(&RequestKey::new("GET", &url(TIMINGS)))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_failure_serves_cached_copy_and_enqueues() {
        let fx = fixture(ScriptedFetcher::new()).await;
        fx.partitions
            .data
            .put(
                &RequestKey::new("GET", &url(TIMINGS)),
                StoredResponse::new(200, "cached timings"),
            )
            .await
            .unwrap();

        let served = fx
            .engine
            .execute(
                Strategy::NetworkFirst,
                InterceptedRequest::get(&url(TIMINGS)).unwrap(),
            )
            .await;

        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "cached timings");
        assert_eq!(fx.context.queue().len().await, 1);
        assert_eq!(fx.engine.stats().await.sync_enqueued, 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_serves_root_or_offline_page() {
        let fx = fixture(ScriptedFetcher::new()).await;
        let request = InterceptedRequest::get(&url("/unknown-route"))
            .unwrap()
            .navigation();

        let served = fx.engine.execute(Strategy::NetworkFirst, request.clone()).await;
        assert_eq!(served.source, ResponseSource::Fallback);
        assert!(served.response.text().contains("غير متصل"));

        fx.partitions
            .dynamic
            .put(&RequestKey::new("GET", &url("/")), StoredResponse::html(200, "root"))
            .await
            .unwrap();
        let served = fx.engine.execute(Strategy::NetworkFirst, request).await;
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "root");
    }

    #[tokio::test]
    async fn test_non_get_success_is_not_stored() {
        let fetcher = ScriptedFetcher::new().ok(&url("/api/preferences"), "{}");
        let fx = fixture(fetcher).await;
        let mut request = InterceptedRequest::get(&url("/api/preferences")).unwrap();
        request.method = axum::http::Method::POST;

        let served = fx.engine.execute(Strategy::NetworkFirst, request).await;

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(fx.partitions.data.len().await.unwrap(), 0);
    }
}
