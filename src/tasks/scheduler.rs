//! Reconciliation Scheduler
//!
//! Runs background jobs on manual, tagged, periodic and connectivity
//! triggers. Each job moves idle -> running -> idle; a job triggered while
//! already running is skipped for that pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::jobs::{Job, JobRunner};
use crate::broadcast::Broadcaster;
use crate::cache::current_timestamp_ms;
use crate::models::ConsumerMessage;
use crate::sync::SyncContext;

/// Tag fired by the built-in periodic trigger.
pub const PERIODIC_TAG: &str = "background-sync";

const TRIGGER_CAPACITY: usize = 32;

/// What woke the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit MANUAL_SYNC
    Manual,
    /// One-shot sync tag fired by the platform
    Tagged(String),
    /// Periodic sync tag
    Periodic(String),
    /// REGISTER_SYNC from a consumer; held while offline
    Register(String),
    /// Connectivity went from offline to online
    ConnectivityRestored,
}

pub type TriggerSender = mpsc::Sender<Trigger>;
pub type TriggerReceiver = mpsc::Receiver<Trigger>;

pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    mpsc::channel(TRIGGER_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    /// Already running when triggered
    Skipped,
}

/// Per-job outcomes of one full pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub completed: Vec<Job>,
    pub failed: Vec<Job>,
    pub skipped: Vec<Job>,
}

// == Scheduler ==
pub struct Scheduler {
    runner: JobRunner,
    context: Arc<SyncContext>,
    broadcaster: Broadcaster,
    states: Mutex<HashMap<Job, JobState>>,
    held_tags: Mutex<Vec<String>>,
    periodic_interval: Duration,
}

impl Scheduler {
    pub fn new(
        runner: JobRunner,
        context: Arc<SyncContext>,
        broadcaster: Broadcaster,
        periodic_interval: Duration,
    ) -> Self {
        Self {
            runner,
            context,
            broadcaster,
            states: Mutex::new(HashMap::new()),
            held_tags: Mutex::new(Vec::new()),
            periodic_interval,
        }
    }

    pub async fn job_state(&self, job: Job) -> JobState {
        self.states
            .lock()
            .await
            .get(&job)
            .copied()
            .unwrap_or(JobState::Idle)
    }

    /// Tags registered while offline, in registration order.
    pub async fn held_tags(&self) -> Vec<String> {
        self.held_tags.lock().await.clone()
    }

    // == Trigger Dispatch ==
    pub async fn handle(&self, trigger: Trigger) {
        debug!("Handling trigger {:?}", trigger);
        match trigger {
            Trigger::Manual => {
                self.run_full_pass().await;
            }
            Trigger::Tagged(tag) => self.run_tag(&tag).await,
            Trigger::Periodic(tag) => self.run_periodic(&tag).await,
            Trigger::Register(tag) => self.register(tag).await,
            Trigger::ConnectivityRestored => self.on_connectivity_restored().await,
        }
    }

    async fn run_tag(&self, tag: &str) {
        match tag {
            "background-sync" => {
                self.run_full_pass().await;
            }
            "sync-prayer-times" => {
                self.run_job(Job::PrayerTimes).await;
            }
            "sync-user-data" => {
                self.run_job(Job::Preferences).await;
            }
            "sync-offline-content" => {
                self.run_job(Job::OfflineContent).await;
            }
            unknown => warn!("Unknown sync tag: {}", unknown),
        }
    }

    async fn run_periodic(&self, tag: &str) {
        if !self.context.is_online() {
            info!("Skipping periodic sync {} while offline", tag);
            return;
        }
        match tag {
            "background-sync" => {
                self.run_full_pass().await;
            }
            "prayer-times-sync" => {
                self.run_job(Job::PrayerTimes).await;
            }
            "content-sync" => {
                self.run_job(Job::OfflineContent).await;
            }
            unknown => warn!("Unknown periodic sync tag: {}", unknown),
        }
    }

    async fn register(&self, tag: String) {
        if self.context.is_online() {
            info!("Sync registered: {}", tag);
            self.run_tag(&tag).await;
        } else {
            info!("Holding sync {} until connectivity returns", tag);
            self.held_tags.lock().await.push(tag);
        }
    }

    async fn on_connectivity_restored(&self) {
        self.run_full_pass().await;
        let held = std::mem::take(&mut *self.held_tags.lock().await);
        for tag in held {
            self.run_tag(&tag).await;
        }
    }

    // == Full Pass ==
    /// Runs every job concurrently and waits for all of them to settle.
    ///
    /// A failing job never cancels the others. Completion is broadcast to
    /// all live consumers.
    pub async fn run_full_pass(&self) -> PassReport {
        info!("Performing background sync");
        let outcomes = join_all(Job::FULL_PASS.iter().map(|job| self.run_job(*job))).await;

        let mut report = PassReport::default();
        for (job, outcome) in Job::FULL_PASS.iter().zip(outcomes) {
            match outcome {
                JobOutcome::Completed => report.completed.push(*job),
                JobOutcome::Failed => report.failed.push(*job),
                JobOutcome::Skipped => report.skipped.push(*job),
            }
        }

        info!(
            "Background sync complete: {} completed, {} failed, {} skipped",
            report.completed.len(),
            report.failed.len(),
            report.skipped.len()
        );
        self.broadcaster.send(ConsumerMessage::BackgroundSyncComplete {
            timestamp: current_timestamp_ms(),
        });
        report
    }

    // == Single Job ==
    pub async fn run_job(&self, job: Job) -> JobOutcome {
        if !self.try_start(job).await {
            info!("Job {} already running, skipping", job.as_str());
            return JobOutcome::Skipped;
        }

        let outcome = match self.runner.run(job).await {
            Ok(()) => JobOutcome::Completed,
            Err(err) => {
                error!("Job {} failed: {}", job.as_str(), err);
                JobOutcome::Failed
            }
        };

        self.states.lock().await.insert(job, JobState::Idle);
        outcome
    }

    async fn try_start(&self, job: Job) -> bool {
        let mut states = self.states.lock().await;
        match states.get(&job) {
            Some(JobState::Running) => false,
            _ => {
                states.insert(job, JobState::Running);
                true
            }
        }
    }

    // == Event Loop ==
    /// Spawns the scheduler loop.
    ///
    /// The loop wakes on queued triggers, on the periodic interval and on
    /// every offline to online transition. Each trigger is handled in its own
    /// task so a long pass never delays the next wake-up.
    ///
    /// # Returns
    /// A JoinHandle for the spawned task, which can be used to abort the task
    /// during graceful shutdown.
    pub fn spawn(self: Arc<Self>, mut triggers: TriggerReceiver) -> JoinHandle<()> {
        let mut connectivity = self.context.connectivity().subscribe();

        tokio::spawn(async move {
            let period = self.periodic_interval;
            info!(
                "Starting reconciliation scheduler with periodic interval of {} seconds",
                period.as_secs()
            );

            let mut periodic = tokio::time::interval_at(Instant::now() + period, period);
            periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let trigger = tokio::select! {
                    received = triggers.recv() => match received {
                        Some(trigger) => trigger,
                        None => {
                            info!("Trigger channel closed, stopping scheduler");
                            break;
                        }
                    },
                    _ = periodic.tick() => Trigger::Periodic(PERIODIC_TAG.to_string()),
                    changed = connectivity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if !*connectivity.borrow_and_update() {
                            continue;
                        }
                        Trigger::ConnectivityRestored
                    }
                };

                let scheduler = self.clone();
                tokio::spawn(async move { scheduler.handle(trigger).await });
            }
        })
    }
}
