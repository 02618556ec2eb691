//! Push and local notification models
//!
//! Normalizes inbound push payloads into displayable notifications and
//! resolves notification clicks to the URL to open.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Icon shown on every notification and its open action.
pub const APP_ICON: &str = "/icons/app-icon.png";

/// Tag carried by notifications fired from SCHEDULE_NOTIFICATION.
pub const SCHEDULED_TAG: &str = "scheduled-notification";

const DEFAULT_TITLE: &str = "صدقة جارية";
const DEFAULT_BODY: &str = "لديك إشعار جديد";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

// == Local Notification ==
/// A notification ready to be shown by a consumer.
///
/// Unknown display options supplied by callers are kept in `extra` and
/// forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub silent: bool,
    pub vibrate: Vec<u32>,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LocalNotification {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: DEFAULT_BODY.to_string(),
            icon: APP_ICON.to_string(),
            badge: APP_ICON.to_string(),
            tag: "general".to_string(),
            require_interaction: true,
            silent: false,
            vibrate: vec![200, 100, 200],
            actions: vec![
                NotificationAction {
                    action: "open".to_string(),
                    title: "فتح التطبيق".to_string(),
                    icon: Some(APP_ICON.to_string()),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "إغلاق".to_string(),
                    icon: None,
                },
            ],
            data: Value::Object(Map::new()),
            extra: Map::new(),
        }
    }
}

impl LocalNotification {
    /// Normalizes a raw push payload.
    ///
    /// Accepts `{notification: {title, body, icon}, data}` as well as flat
    /// payloads; anything unparsable yields the defaults.
    pub fn from_push(payload: &[u8]) -> Self {
        let notification = Self::default();
        if payload.is_empty() {
            return notification;
        }

        let mut fields = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                warn!("Ignoring non-object push payload: {}", other);
                return notification;
            }
            Err(err) => {
                warn!("Failed to parse push payload: {}", err);
                return notification;
            }
        };

        if let Some(Value::Object(inner)) = fields.remove("notification") {
            for (key, value) in inner {
                fields.entry(key).or_insert(value);
            }
        }
        notification.overlay(fields)
    }

    /// Notification fired by a schedule request. Caller options win over
    /// the defaults.
    pub fn scheduled(title: &str, body: &str, options: Map<String, Value>) -> Self {
        let base = Self {
            title: title.to_string(),
            body: body.to_string(),
            tag: SCHEDULED_TAG.to_string(),
            actions: Vec::new(),
            ..Self::default()
        };
        base.overlay(options)
    }

    /// Shallow merge of `fields` over this notification. A merge that would
    /// produce an invalid notification is logged and discarded.
    pub fn overlay(self, fields: Map<String, Value>) -> Self {
        if fields.is_empty() {
            return self;
        }
        let mut merged = match serde_json::to_value(&self) {
            Ok(Value::Object(map)) => map,
            _ => return self,
        };
        merged.extend(fields);

        match serde_json::from_value(Value::Object(merged)) {
            Ok(notification) => notification,
            Err(err) => {
                warn!("Ignoring invalid notification options: {}", err);
                self
            }
        }
    }
}

// == Notification Click ==
/// A click on a shown notification, possibly on one of its actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationClick {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl NotificationClick {
    /// URL to open, or None when the click only dismisses.
    pub fn target(&self) -> Option<String> {
        if self.action.as_deref() == Some("close") {
            return None;
        }
        let url = self
            .data
            .as_ref()
            .and_then(|data| data.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("/");
        Some(url.to_string())
    }
}
