//! Service Bootstrap
//!
//! Wires storage, strategies, sync state, scheduler and control channel
//! together, and runs the install and activation sequences.
//!
//! # Lifecycle
//! 1. `build`: open storage and the four live partitions
//! 2. `install`: seed core resources, app pages and the offline record
//! 3. `activate`: purge stale partitions, restore the sync queue, start the
//!    scheduler, drain pending sync items

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use crate::api::AppState;
use crate::broadcast::Broadcaster;
use crate::cache::{CacheStorage, PartitionManager, PartitionNames, PartitionSet, SeedReport};
use crate::config::Config;
use crate::control::Controller;
use crate::error::{CacheError, Result};
use crate::net::Fetcher;
use crate::strategy::StrategyEngine;
use crate::sync::{DrainReport, SyncContext};
use crate::tasks::{trigger_channel, JobRunner, Scheduler, TriggerReceiver, TriggerSender};

/// Reserved offline-partition key holding the offline seed record.
pub const OFFLINE_DATA_KEY: &str = "/offline-data";

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub core: SeedReport,
    pub pages: SeedReport,
    pub offline_seeded: bool,
}

#[derive(Debug)]
pub struct Activation {
    pub purged: Vec<String>,
    pub restored: usize,
    pub drained: DrainReport,
    /// The scheduler loop; None when it was already started
    pub scheduler: Option<JoinHandle<()>>,
}

pub struct App {
    config: Config,
    origin: Url,
    manager: Arc<PartitionManager>,
    partitions: PartitionSet,
    fetcher: Arc<dyn Fetcher>,
    context: Arc<SyncContext>,
    broadcaster: Broadcaster,
    engine: Arc<StrategyEngine>,
    controller: Arc<Controller>,
    scheduler: Arc<Scheduler>,
    triggers: TriggerSender,
    pending_triggers: Option<TriggerReceiver>,
}

impl App {
    /// Opens storage per `config` (write-through directory or memory only).
    pub async fn build(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let storage = match &config.storage_dir {
            Some(dir) => {
                info!("Persisting partitions under {}", dir.display());
                CacheStorage::open_dir(dir).await?
            }
            None => CacheStorage::in_memory(),
        };
        Self::with_storage(config, Arc::new(storage), fetcher).await
    }

    pub async fn with_storage(
        config: Config,
        storage: Arc<CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.app_origin)
            .map_err(|e| CacheError::InvalidRequest(format!("Invalid app origin: {}", e)))?;

        let manager = Arc::new(PartitionManager::new(
            storage,
            fetcher.clone(),
            PartitionNames::from_config(&config),
        ));
        let partitions = manager.ensure_all().await?;
        let context = Arc::new(SyncContext::with_data_partition(partitions.data.clone()));
        let broadcaster = Broadcaster::new();

        let engine = Arc::new(StrategyEngine::new(
            &config,
            manager.clone(),
            partitions.clone(),
            fetcher.clone(),
            context.clone(),
        )?);

        let runner = JobRunner::new(
            &config,
            manager.clone(),
            partitions.data.clone(),
            fetcher.clone(),
            context.clone(),
            broadcaster.clone(),
        );
        let scheduler = Arc::new(Scheduler::new(
            runner,
            context.clone(),
            broadcaster.clone(),
            Duration::from_secs(config.periodic_sync_secs),
        ));

        let (triggers, pending_triggers) = trigger_channel();
        let controller = Arc::new(Controller::new(
            manager.clone(),
            context.clone(),
            broadcaster.clone(),
            triggers.clone(),
            origin.clone(),
        ));

        Ok(Self {
            config,
            origin,
            manager,
            partitions,
            fetcher,
            context,
            broadcaster,
            engine,
            controller,
            scheduler,
            triggers,
            pending_triggers: Some(pending_triggers),
        })
    }

    // == Install ==
    /// Seeds the partitions. Every item is best-effort; failures are logged
    /// and reported, never fatal.
    pub async fn install(&self) -> InstallReport {
        info!("Installing cache version {}", self.config.cache_version);

        let mut resources = self.resolve(&self.config.core_resources);
        resources.extend(self.resolve(&self.config.external_resources));
        let pages = self.resolve(&self.config.app_pages);

        let (core, pages, offline_seeded) = tokio::join!(
            self.manager.seed_core(&resources),
            self.manager.add_all(&self.partitions.dynamic, &pages),
            self.seed_offline_data()
        );

        if !core.failed.is_empty() || !pages.failed.is_empty() {
            warn!(
                "Installed with {} core and {} page failure(s)",
                core.failed.len(),
                pages.failed.len()
            );
        }
        info!("Installation completed");
        InstallReport {
            core,
            pages,
            offline_seeded,
        }
    }

    async fn seed_offline_data(&self) -> bool {
        let record = json!({
            "adhkar": [],
            "prayers": [],
            "settings": {},
            "lastUpdate": chrono::Utc::now().to_rfc3339(),
        });
        match self
            .partitions
            .offline
            .write_json(OFFLINE_DATA_KEY, &record)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to initialize offline data: {}", err);
                false
            }
        }
    }

    fn resolve(&self, paths: &[String]) -> Vec<Url> {
        paths
            .iter()
            .filter_map(|path| match self.origin.join(path) {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!("Skipping unresolvable resource {}: {}", path, err);
                    None
                }
            })
            .collect()
    }

    // == Activate ==
    pub async fn activate(&mut self) -> Activation {
        info!("Activating cache version {}", self.config.cache_version);

        let purged = self.manager.purge_stale(&self.manager.names().to_set()).await;
        let restored = self.context.queue().restore().await;
        let scheduler = self
            .pending_triggers
            .take()
            .map(|rx| self.scheduler.clone().spawn(rx));
        let drained = self.context.queue().drain(self.fetcher.as_ref()).await;

        info!("Activated");
        Activation {
            purged,
            restored,
            drained,
            scheduler,
        }
    }

    /// Shared state for the HTTP surface.
    pub fn state(&self) -> AppState {
        AppState {
            engine: self.engine.clone(),
            controller: self.controller.clone(),
            manager: self.manager.clone(),
            broadcaster: self.broadcaster.clone(),
            fetcher: self.fetcher.clone(),
            origin: self.origin.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<StrategyEngine> {
        &self.engine
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.context
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn manager(&self) -> &Arc<PartitionManager> {
        &self.manager
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Sender feeding the scheduler loop.
    pub fn triggers(&self) -> TriggerSender {
        self.triggers.clone()
    }
}
