// ── Connection health tracking ──
//
// Two-state machine driven by the host's connect/disconnect callbacks.
// The record is swapped as a whole with `ArcSwap::rcu`, so a transition is
// decided and applied atomically and readers never see half an update.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::reconnect::ReconnectScheduler;
use crate::diagnostics::DiagnosticsAggregator;
use crate::host::AccessGate;
use crate::model::ConnectionState;

/// Connection state plus the bookkeeping accumulated across transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub state: ConnectionState,
    /// Start of the current session; `None` while disconnected.
    pub connected_since: Option<Instant>,
    pub last_changed_at: Option<DateTime<Utc>>,
    /// Connected time of all finished sessions.
    pub accumulated: Duration,
    pub connect_count: u64,
    pub disconnect_count: u64,
}

impl ConnectionRecord {
    /// Total connected time as of `now`, counting the live session.
    pub fn total_connected(&self, now: Instant) -> Duration {
        match self.connected_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }

    fn connected(&self, now: Instant, wall: DateTime<Utc>) -> Option<Self> {
        (self.state == ConnectionState::Disconnected).then(|| Self {
            state: ConnectionState::Connected,
            connected_since: Some(now),
            last_changed_at: Some(wall),
            connect_count: self.connect_count + 1,
            ..self.clone()
        })
    }

    fn disconnected(&self, now: Instant, wall: DateTime<Utc>) -> Option<Self> {
        (self.state == ConnectionState::Connected).then(|| Self {
            state: ConnectionState::Disconnected,
            connected_since: None,
            last_changed_at: Some(wall),
            accumulated: self.total_connected(now),
            disconnect_count: self.disconnect_count + 1,
            ..self.clone()
        })
    }
}

/// Tracks listener connectivity and drives reconnection on loss.
pub struct ConnectionHealthTracker {
    record: ArcSwap<ConnectionRecord>,
    diagnostics: Arc<DiagnosticsAggregator>,
    scheduler: Arc<ReconnectScheduler>,
    access: AccessGate,
}

impl ConnectionHealthTracker {
    pub fn new(
        diagnostics: Arc<DiagnosticsAggregator>,
        scheduler: Arc<ReconnectScheduler>,
        access: AccessGate,
    ) -> Self {
        Self {
            record: ArcSwap::from_pointee(ConnectionRecord::default()),
            diagnostics,
            scheduler,
            access,
        }
    }

    /// Handle a connect callback. Returns `true` if the state changed.
    pub fn on_connected(&self) -> bool {
        let Some(record) = self.transition(ConnectionRecord::connected) else {
            debug!("connect callback while already connected");
            return false;
        };

        info!(connect_count = record.connect_count, "listener connected");
        self.scheduler.reset();
        self.diagnostics.record_connection_transition(record);
        true
    }

    /// Handle a disconnect callback. Returns `true` if the state changed.
    ///
    /// Reconnection is scheduled on every disconnect callback while access
    /// is granted; the scheduler coalesces and caps the attempts.
    pub fn on_disconnected(&self) -> bool {
        let changed = match self.transition(ConnectionRecord::disconnected) {
            Some(record) => {
                warn!(
                    disconnect_count = record.disconnect_count,
                    total_connected_ms = u64::try_from(record.accumulated.as_millis()).unwrap_or(u64::MAX),
                    "listener disconnected"
                );
                self.diagnostics.record_connection_transition(record);
                true
            }
            None => {
                debug!("disconnect callback while already disconnected");
                false
            }
        };

        if self.access.is_access_granted() {
            self.scheduler.schedule();
        } else {
            warn!("notification access revoked, automatic reconnect skipped until access is granted again");
        }
        changed
    }

    pub fn state(&self) -> ConnectionState {
        self.record.load().state
    }

    pub fn record(&self) -> Arc<ConnectionRecord> {
        self.record.load_full()
    }

    /// Apply `next` atomically; returns the new record if it applied.
    fn transition(
        &self,
        next: fn(&ConnectionRecord, Instant, DateTime<Utc>) -> Option<ConnectionRecord>,
    ) -> Option<Arc<ConnectionRecord>> {
        let now = Instant::now();
        let wall = Utc::now();
        let previous = self.record.rcu(|current| {
            next(current, now, wall).map_or_else(|| Arc::clone(current), Arc::new)
        });
        next(&previous, now, wall).map(Arc::new)
    }
}
