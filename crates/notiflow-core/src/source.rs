// ── Event source contract ──
//
// The four callbacks a host notification service delivers. The pipeline
// implements this; the host calls it in order: connected, any number of
// posted/removed, then disconnected. Every method must return promptly.

use crate::model::HostNotification;

/// Host callback surface feeding the pipeline.
pub trait EventSource: Send + Sync {
    fn on_connected(&self);

    fn on_notification_posted(&self, notification: HostNotification);

    fn on_notification_removed(&self, key: &str);

    fn on_disconnected(&self);
}
