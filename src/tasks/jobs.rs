//! Reconciliation Jobs
//!
//! The individual units of background work. Each job touches only the data
//! partition, the sync queue or the partition list, and reports failure as
//! an error without affecting any other job.

use std::sync::Arc;

use axum::http::Method;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::broadcast::Broadcaster;
use crate::cache::{PartitionHandle, PartitionManager};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::ConsumerMessage;
use crate::net::{Fetcher, InterceptedRequest};
use crate::sync::SyncContext;

/// Last known user location, written by the application.
pub const USER_LOCATION_KEY: &str = "/user-location";
pub const PRAYER_TIMES_KEY: &str = "/prayer-times";
pub const PRAYER_TIMES_LAST_UPDATE_KEY: &str = "/prayer-times-last-update";
pub const USER_PREFERENCES_KEY: &str = "/user-preferences";
pub const OFFLINE_CONTENT_STATUS_KEY: &str = "/offline-content-status";

// == Job ==
/// A background job with its own idle/running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    PrayerTimes,
    Preferences,
    OfflineContent,
    CacheCleanup,
    /// Replay of the sync queue
    SyncQueue,
}

impl Job {
    /// Jobs run by one full reconciliation pass.
    pub const FULL_PASS: [Job; 5] = [
        Job::PrayerTimes,
        Job::Preferences,
        Job::OfflineContent,
        Job::CacheCleanup,
        Job::SyncQueue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::PrayerTimes => "prayer-times",
            Job::Preferences => "preferences",
            Job::OfflineContent => "offline-content",
            Job::CacheCleanup => "cache-cleanup",
            Job::SyncQueue => "sync-queue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
struct PrayerTimesUpdate {
    timestamp: String,
    location: UserLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesSnapshot {
    last_sync: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OfflineContentStatus {
    last_update: String,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct TimingsEnvelope {
    data: TimingsData,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: Value,
}

// == Job Runner ==
/// Executes jobs against the live partitions.
pub struct JobRunner {
    manager: Arc<PartitionManager>,
    data: PartitionHandle,
    fetcher: Arc<dyn Fetcher>,
    context: Arc<SyncContext>,
    broadcaster: Broadcaster,
    prayer_api_base: String,
    prayer_method: u32,
    cache_version: String,
}

impl JobRunner {
    pub fn new(
        config: &Config,
        manager: Arc<PartitionManager>,
        data: PartitionHandle,
        fetcher: Arc<dyn Fetcher>,
        context: Arc<SyncContext>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            manager,
            data,
            fetcher,
            context,
            broadcaster,
            prayer_api_base: config.prayer_api_base.clone(),
            prayer_method: config.prayer_method,
            cache_version: config.cache_version.clone(),
        }
    }

    pub async fn run(&self, job: Job) -> Result<()> {
        match job {
            Job::PrayerTimes => self.sync_prayer_times().await.map(|_| ()),
            Job::Preferences => self.sync_preferences().await,
            Job::OfflineContent => self.sync_offline_content().await,
            Job::CacheCleanup => {
                let deleted = self.manager.cleanup_deprecated().await;
                if !deleted.is_empty() {
                    info!("Cache cleanup removed {:?}", deleted);
                }
                Ok(())
            }
            Job::SyncQueue => {
                self.context.queue().drain(self.fetcher.as_ref()).await;
                Ok(())
            }
        }
    }

    // == Prayer Times ==
    /// Refreshes prayer times for the stored location.
    ///
    /// Returns false when there is no stored location or the provider
    /// answered with a non-ok status.
    pub async fn sync_prayer_times(&self) -> Result<bool> {
        let Some(location) = self.data.read_json::<UserLocation>(USER_LOCATION_KEY).await? else {
            debug!("No stored location, skipping prayer times sync");
            return Ok(false);
        };

        let request = InterceptedRequest::new(Method::GET, self.timings_url(&location)?);
        let response = self.fetcher.fetch(&request).await?;
        if !response.is_ok() {
            warn!("Prayer times provider answered {}", response.status);
            return Ok(false);
        }

        let timings = response.json_body::<TimingsEnvelope>()?.data.timings;
        self.data.write_json(PRAYER_TIMES_KEY, &timings).await?;
        self.data
            .write_json(
                PRAYER_TIMES_LAST_UPDATE_KEY,
                &PrayerTimesUpdate {
                    timestamp: Utc::now().to_rfc3339(),
                    location,
                },
            )
            .await?;

        info!("Prayer times synced");
        self.broadcaster.send(ConsumerMessage::prayer_times(timings));
        Ok(true)
    }

    fn timings_url(&self, location: &UserLocation) -> Result<Url> {
        let endpoint = format!("{}/v1/timings", self.prayer_api_base.trim_end_matches('/'));
        Url::parse_with_params(
            &endpoint,
            &[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("method", self.prayer_method.to_string()),
            ],
        )
        .map_err(|e| CacheError::InvalidRequest(format!("Invalid prayer API base: {}", e)))
    }

    // == Preferences ==
    pub async fn sync_preferences(&self) -> Result<()> {
        let snapshot = PreferencesSnapshot {
            last_sync: Utc::now().to_rfc3339(),
            version: self.cache_version.clone(),
        };
        self.data.write_json(USER_PREFERENCES_KEY, &snapshot).await?;
        info!("User preferences synced");
        Ok(())
    }

    // == Offline Content ==
    pub async fn sync_offline_content(&self) -> Result<()> {
        let status = OfflineContentStatus {
            last_update: Utc::now().to_rfc3339(),
            status: "synced",
        };
        self.data
            .write_json(OFFLINE_CONTENT_STATUS_KEY, &status)
            .await?;
        info!("Offline content synced");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::runner;
    use super::*;
    use crate::net::testing::ScriptedFetcher;
    use crate::net::StoredResponse;
    use serde_json::json;

    const TIMINGS_URL: &str =
        "https://api.aladhan.com/v1/timings?latitude=21.42&longitude=39.83&method=5";

    fn timings_body() -> StoredResponse {
        StoredResponse::json(
            200,
            &json!({"code": 200, "data": {"timings": {"Fajr": "04:12", "Maghrib": "18:40"}}}),
        )
    }

    #[tokio::test]
    async fn test_prayer_times_without_location_is_noop() {
        let fx = runner(ScriptedFetcher::new()).await;

        assert!(!fx.runner.sync_prayer_times().await.unwrap());
        assert_eq!(fx.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_prayer_times_stores_and_broadcasts() {
        let fx = runner(ScriptedFetcher::new().respond(TIMINGS_URL, timings_body())).await;
        let mut consumer = fx.broadcaster.subscribe();
        fx.partitions
            .data
            .write_json(
                USER_LOCATION_KEY,
                &UserLocation {
                    latitude: 21.42,
                    longitude: 39.83,
                },
            )
            .await
            .unwrap();

        assert!(fx.runner.sync_prayer_times().await.unwrap());

        let stored: Value = fx
            .partitions
            .data
            .read_json(PRAYER_TIMES_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, json!({"Fajr": "04:12", "Maghrib": "18:40"}));

        let update: Value = fx
            .partitions
            .data
            .read_json(PRAYER_TIMES_LAST_UPDATE_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update["location"], json!({"latitude": 21.42, "longitude": 39.83}));
        assert!(update["timestamp"].is_string());

        assert_eq!(
            consumer.recv().await.unwrap(),
            ConsumerMessage::prayer_times(json!({"Fajr": "04:12", "Maghrib": "18:40"}))
        );
    }

    #[tokio::test]
    async fn test_prayer_times_network_failure_is_error() {
        let fx = runner(ScriptedFetcher::new()).await;
        fx.partitions
            .data
            .write_json(
                USER_LOCATION_KEY,
                &UserLocation {
                    latitude: 21.42,
                    longitude: 39.83,
                },
            )
            .await
            .unwrap();

        let result = fx.runner.sync_prayer_times().await;

        assert!(matches!(result, Err(CacheError::Upstream(_))));
        assert!(fx
            .partitions
            .data
            .read_json::<Value>(PRAYER_TIMES_KEY)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_preferences_and_offline_content_records() {
        let fx = runner(ScriptedFetcher::new()).await;

        fx.runner.run(Job::Preferences).await.unwrap();
        fx.runner.run(Job::OfflineContent).await.unwrap();

        let prefs: Value = fx
            .partitions
            .data
            .read_json(USER_PREFERENCES_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(prefs["version"], "1.2.0");
        assert!(prefs["lastSync"].is_string());

        let status: Value = fx
            .partitions
            .data
            .read_json(OFFLINE_CONTENT_STATUS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["status"], "synced");
    }

    #[tokio::test]
    async fn test_cleanup_removes_marked_partitions() {
        let fx = runner(ScriptedFetcher::new()).await;
        fx.storage.open("old-audio-cache").await.unwrap();
        fx.storage.open("deprecated-v0").await.unwrap();

        fx.runner.run(Job::CacheCleanup).await.unwrap();

        let names = fx.storage.keys().await;
        assert_eq!(names.len(), 4);
        assert!(!names.iter().any(|n| n.contains("old") || n.contains("deprecated")));
    }

    #[tokio::test]
    async fn test_sync_queue_job_drains() {
        let fx = runner(ScriptedFetcher::new()).await;
        fx.context
            .queue()
            .enqueue(&InterceptedRequest::get("https://api.test/a").unwrap())
            .await;

        fx.runner.run(Job::SyncQueue).await.unwrap();

        assert!(fx.context.queue().is_empty().await);
        assert_eq!(fx.fetcher.calls("https://api.test/a"), 1);
    }
}
