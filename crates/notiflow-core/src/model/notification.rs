// ── Notification domain types ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Host flag bit marking a notification as the summary of a group.
pub const FLAG_GROUP_SUMMARY: u32 = 0x0000_0200;

/// A notification exactly as the host delivers it to the listener.
///
/// The pipeline never classifies this directly; the event source adapter
/// converts it into a [`RawNotificationEvent`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostNotification {
    /// Package (source app) that posted the notification.
    pub package_name: String,
    /// Host-unique key of this notification instance.
    pub key: String,
    #[serde(default)]
    pub group_key: Option<String>,
    /// Epoch milliseconds at which the host posted the notification.
    #[serde(default)]
    pub post_time: i64,
    /// Host notification flags (see [`FLAG_GROUP_SUMMARY`]).
    #[serde(default)]
    pub flags: u32,
    /// Content extras: `title`, `text`, `big_text`, `sub_text` and anything else.
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl HostNotification {
    pub fn is_group_summary(&self) -> bool {
        self.flags & FLAG_GROUP_SUMMARY != 0
    }
}

/// Immutable notification event flowing through the pipeline.
///
/// Created once at callback time and shared with bus subscribers as
/// `Arc<RawNotificationEvent>`; no stage mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotificationEvent {
    pub source_app: String,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Opaque passthrough of the host's extras.
    #[serde(default)]
    pub extras: Map<String, Value>,
    pub posted_at_millis: i64,
    /// Unique per notification instance. Treated as an opaque handle.
    pub event_key: String,
    pub group_key: Option<String>,
    pub is_group_summary: bool,
}

impl RawNotificationEvent {
    /// Minimal event for a source app, used when building events by hand.
    pub fn new(source_app: impl Into<String>, event_key: impl Into<String>) -> Self {
        Self {
            source_app: source_app.into(),
            title: None,
            body: None,
            extras: Map::new(),
            posted_at_millis: 0,
            event_key: event_key.into(),
            group_key: None,
            is_group_summary: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_group_summary(mut self, is_group_summary: bool) -> Self {
        self.is_group_summary = is_group_summary;
        self
    }
}
