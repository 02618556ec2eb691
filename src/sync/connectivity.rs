//! Connectivity State
//!
//! A process-wide online flag that wakes subscribers on every change.

use tokio::sync::watch;
use tracing::{debug, info};

/// Online/offline flag shared by strategies, platform events and the scheduler.
#[derive(Debug)]
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Records the observed state. Returns true only on an offline to online
    /// transition.
    pub fn set_online(&self, online: bool) -> bool {
        let mut restored = false;
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            restored = online;
            true
        });
        if restored {
            info!("Connectivity restored");
        } else if !online {
            debug!("Connectivity observed offline");
        }
        restored
    }

    /// Receiver notified whenever the flag flips.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
