// ── Diagnostics read model ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Listener connection state as reported by the host callbacks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Point-in-time view of every pipeline counter and the connection record.
///
/// `total_emitted` is always `emitted_by_keyword + emitted_without_keyword`;
/// the aggregator derives it rather than counting it separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub total_emitted: u64,
    pub emitted_by_keyword: u64,
    pub emitted_without_keyword: u64,
    pub skipped_unsupported_package: u64,
    pub skipped_group_summary: u64,
    pub skipped_no_keywords_by_config: u64,
    pub notifications_removed: u64,

    pub connection: ConnectionState,
    pub connect_count: u64,
    pub disconnect_count: u64,
    /// Cumulative connected time, including the current session if connected.
    pub total_connected_ms: u64,
    /// Wall-clock time of the last connection state change.
    pub last_changed_at: Option<DateTime<Utc>>,
    /// Automatic reconnection attempts made since the last successful connect.
    pub reconnect_attempts: u32,
}

impl DiagnosticsSnapshot {
    /// Number of posted notifications accounted for by the counters.
    pub fn total_received(&self) -> u64 {
        self.total_emitted
            + self.skipped_unsupported_package
            + self.skipped_group_summary
            + self.skipped_no_keywords_by_config
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }
}
