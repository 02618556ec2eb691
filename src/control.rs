//! Control Channel
//!
//! Dispatches inbound consumer commands. Malformed or unknown commands are
//! logged and rejected without ever failing the channel.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::broadcast::Broadcaster;
use crate::cache::{validate_partition_name, PartitionManager, SeedReport};
use crate::error::{CacheError, Result};
use crate::models::{
    Accepted, CacheStatus, CacheStatusReply, ControlCommand, ConsumerMessage, LocalNotification,
};
use crate::sync::SyncContext;
use crate::tasks::{schedule_notification, Trigger, TriggerSender};

/// Reply to one control message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ControlReply {
    Accepted(Accepted),
    CacheStatus(CacheStatusReply),
}

pub struct Controller {
    manager: Arc<PartitionManager>,
    context: Arc<SyncContext>,
    broadcaster: Broadcaster,
    triggers: TriggerSender,
    origin: Url,
}

impl Controller {
    pub fn new(
        manager: Arc<PartitionManager>,
        context: Arc<SyncContext>,
        broadcaster: Broadcaster,
        triggers: TriggerSender,
        origin: Url,
    ) -> Self {
        Self {
            manager,
            context,
            broadcaster,
            triggers,
            origin,
        }
    }

    // == Dispatch ==
    /// Handles a raw `{type, data}` message.
    pub async fn dispatch(&self, payload: &[u8]) -> ControlReply {
        match ControlCommand::parse(payload) {
            Ok(command) => self.execute(command).await,
            Err(err) => {
                warn!("Ignoring malformed control message: {}", err);
                ControlReply::Accepted(Accepted { accepted: false })
            }
        }
    }

    pub async fn execute(&self, command: ControlCommand) -> ControlReply {
        info!("Control command {}", command.name());
        let accepted = match command {
            ControlCommand::ScheduleNotification(request) => {
                schedule_notification(self.broadcaster.clone(), request);
                true
            }
            ControlCommand::RegisterSync { tag } => self.trigger(Trigger::Register(tag)).await,
            ControlCommand::ManualSync => self.trigger(Trigger::Manual).await,
            ControlCommand::CacheContent { urls, cache_name } => {
                let name = cache_name.unwrap_or_else(|| self.manager.names().dynamic.clone());
                match validate_partition_name(&name) {
                    Ok(()) => {
                        self.spawn_cache_content(name, urls);
                        true
                    }
                    Err(err) => {
                        warn!("Rejecting CACHE_CONTENT: {}", err);
                        false
                    }
                }
            }
            ControlCommand::GetCacheStatus => {
                return ControlReply::CacheStatus(self.status_reply().await);
            }
        };
        ControlReply::Accepted(Accepted { accepted })
    }

    async fn trigger(&self, trigger: Trigger) -> bool {
        match self.triggers.send(trigger).await {
            Ok(()) => true,
            Err(err) => {
                warn!("Scheduler is not running, dropping {:?}", err.0);
                false
            }
        }
    }

    // == Cache Content ==
    /// Best-effort bulk add of `urls` into the named partition.
    pub async fn cache_content(&self, name: &str, urls: &[String]) -> Result<SeedReport> {
        cache_content(&self.manager, &self.origin, name, urls).await
    }

    fn spawn_cache_content(&self, name: String, urls: Vec<String>) {
        let manager = self.manager.clone();
        let origin = self.origin.clone();
        tokio::spawn(async move {
            if let Err(err) = cache_content(&manager, &origin, &name, &urls).await {
                warn!("Failed to cache content into {}: {}", name, err);
            }
        });
    }

    // == Status ==
    /// Live partitions and sync state.
    ///
    /// Fails when the data partition holding the sync queue is gone.
    pub async fn cache_status(&self) -> Result<CacheStatus> {
        let caches = self.manager.partition_names().await;
        let data = &self.manager.names().data;
        if !caches.contains(data) {
            return Err(CacheError::PartitionMissing(data.clone()));
        }
        Ok(CacheStatus {
            caches,
            is_online: self.context.is_online(),
            sync_queue_length: self.context.queue().len().await,
            last_update: Utc::now().to_rfc3339(),
        })
    }

    /// Status snapshot wrapped in the CACHE_STATUS envelope.
    pub async fn status_reply(&self) -> CacheStatusReply {
        match self.cache_status().await {
            Ok(status) => CacheStatusReply::data(status),
            Err(err) => {
                warn!("Cache status unavailable: {}", err);
                CacheStatusReply::error(err.to_string())
            }
        }
    }

    // == Push ==
    /// Normalizes a push payload and shows it to live consumers.
    pub fn deliver_push(&self, payload: &[u8]) -> LocalNotification {
        let notification = LocalNotification::from_push(payload);
        self.broadcaster
            .send(ConsumerMessage::Notification(notification.clone()));
        notification
    }

    /// Applies a platform online/offline event.
    pub fn set_online(&self, online: bool) -> bool {
        self.context.connectivity().set_online(online)
    }
}

/// Relative URLs resolve against the app origin; unparsable ones count as
/// failed.
async fn cache_content(
    manager: &PartitionManager,
    origin: &Url,
    name: &str,
    urls: &[String],
) -> Result<SeedReport> {
    validate_partition_name(name)?;
    let handle = manager.ensure_partition(name).await?;

    let mut resolved = Vec::with_capacity(urls.len());
    let mut invalid = Vec::new();
    for raw in urls {
        match origin.join(raw) {
            Ok(url) => resolved.push(url),
            Err(err) => {
                warn!("Skipping invalid URL {}: {}", raw, err);
                invalid.push(raw.clone());
            }
        }
    }

    let mut report = manager.add_all(&handle, &resolved).await;
    report.failed.extend(invalid);
    info!(
        "Cached {} of {} item(s) into {}",
        report.cached,
        urls.len(),
        name
    );
    Ok(report)
}
