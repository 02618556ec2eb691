//! Scheduled Notifications
//!
//! Timers that fire a local notification broadcast at a requested time.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::cache::current_timestamp_ms;
use crate::models::{ConsumerMessage, LocalNotification, ScheduleNotification};

/// Spawns a timer that broadcasts the notification at `request.timestamp`.
///
/// Returns None, and schedules nothing, when the timestamp is not in the
/// future. Pending timers do not survive a restart.
pub fn schedule_notification(
    broadcaster: Broadcaster,
    request: ScheduleNotification,
) -> Option<JoinHandle<()>> {
    let now = current_timestamp_ms();
    if request.timestamp <= now {
        debug!(
            "Ignoring notification '{}' scheduled in the past",
            request.title
        );
        return None;
    }

    let delay = Duration::from_millis(request.timestamp - now);
    info!(
        "Scheduling notification '{}' in {} seconds",
        request.title,
        delay.as_secs()
    );

    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let notification =
            LocalNotification::scheduled(&request.title, &request.body, request.options);
        broadcaster.send(ConsumerMessage::Notification(notification));
    }))
}
