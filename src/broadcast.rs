//! Consumer Broadcast
//!
//! Fan-out of outbound messages to every live consumer. Consumers that are
//! not subscribed when a message is sent never see it.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::ConsumerMessage;

/// Messages buffered per lagging consumer before it starts missing some.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<ConsumerMessage>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Sends `message` to all current subscribers and returns how many
    /// received it.
    pub fn send(&self, message: ConsumerMessage) -> usize {
        let kind = message.kind();
        match self.tx.send(message) {
            Ok(receivers) => {
                debug!("Broadcast {} to {} consumer(s)", kind, receivers);
                receivers
            }
            Err(_) => {
                debug!("No live consumers for {}", kind);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsumerMessage> {
        self.tx.subscribe()
    }

    pub fn consumer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
