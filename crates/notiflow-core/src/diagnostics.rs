// ── Diagnostics aggregator ──
//
// Lock-free counters plus the latest connection record, folded into a
// `DiagnosticsSnapshot` that observers receive through a `watch` channel.
// Mutations only touch atomics and raise a `Notify`; the snapshot is rebuilt
// and sent by `run_publisher` on the runtime, never on the callback thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::health::ConnectionRecord;
use crate::model::{ClassificationOutcome, DiagnosticsSnapshot};

/// Process-lifetime counters for the notification pipeline.
pub struct DiagnosticsAggregator {
    emitted_by_keyword: AtomicU64,
    emitted_without_keyword: AtomicU64,
    skipped_unsupported_package: AtomicU64,
    skipped_group_summary: AtomicU64,
    skipped_no_keywords_by_config: AtomicU64,
    notifications_removed: AtomicU64,
    reconnect_attempts: AtomicU32,
    connection: ArcSwap<ConnectionRecord>,
    changed: Notify,
    snapshot_tx: watch::Sender<DiagnosticsSnapshot>,
}

impl DiagnosticsAggregator {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(DiagnosticsSnapshot::default());
        Self {
            emitted_by_keyword: AtomicU64::new(0),
            emitted_without_keyword: AtomicU64::new(0),
            skipped_unsupported_package: AtomicU64::new(0),
            skipped_group_summary: AtomicU64::new(0),
            skipped_no_keywords_by_config: AtomicU64::new(0),
            notifications_removed: AtomicU64::new(0),
            reconnect_attempts: AtomicU32::new(0),
            connection: ArcSwap::from_pointee(ConnectionRecord::default()),
            changed: Notify::new(),
            snapshot_tx,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Count one classified notification under exactly one counter.
    pub fn record(&self, outcome: ClassificationOutcome) {
        let counter = match outcome {
            ClassificationOutcome::Accepted {
                matched_keyword: true,
            } => &self.emitted_by_keyword,
            ClassificationOutcome::Accepted {
                matched_keyword: false,
            } => &self.emitted_without_keyword,
            ClassificationOutcome::RejectedUnsupportedSource => &self.skipped_unsupported_package,
            ClassificationOutcome::RejectedGroupSummary => &self.skipped_group_summary,
            ClassificationOutcome::RejectedNoKeywordByPolicy => &self.skipped_no_keywords_by_config,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.publish();
    }

    /// Store the connection record produced by a state transition.
    pub fn record_connection_transition(&self, record: Arc<ConnectionRecord>) {
        self.connection.store(record);
        self.publish();
    }

    pub fn record_removed(&self) {
        self.notifications_removed.fetch_add(1, Ordering::Relaxed);
        self.publish();
    }

    pub fn record_reconnect_attempts(&self, attempts: u32) {
        self.reconnect_attempts.store(attempts, Ordering::Relaxed);
        self.publish();
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Build a fresh snapshot; connected time includes the live session.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let emitted_by_keyword = self.emitted_by_keyword.load(Ordering::Relaxed);
        let emitted_without_keyword = self.emitted_without_keyword.load(Ordering::Relaxed);
        let connection = self.connection.load();
        let total_connected = connection.total_connected(Instant::now());

        DiagnosticsSnapshot {
            total_emitted: emitted_by_keyword + emitted_without_keyword,
            emitted_by_keyword,
            emitted_without_keyword,
            skipped_unsupported_package: self.skipped_unsupported_package.load(Ordering::Relaxed),
            skipped_group_summary: self.skipped_group_summary.load(Ordering::Relaxed),
            skipped_no_keywords_by_config: self
                .skipped_no_keywords_by_config
                .load(Ordering::Relaxed),
            notifications_removed: self.notifications_removed.load(Ordering::Relaxed),
            connection: connection.state,
            connect_count: connection.connect_count,
            disconnect_count: connection.disconnect_count,
            total_connected_ms: u64::try_from(total_connected.as_millis()).unwrap_or(u64::MAX),
            last_changed_at: connection.last_changed_at,
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }

    /// Observe snapshots. The receiver starts with an up-to-date value;
    /// later values arrive while [`run_publisher`](Self::run_publisher) runs.
    pub fn subscribe(&self) -> watch::Receiver<DiagnosticsSnapshot> {
        self.snapshot_tx.send_replace(self.snapshot());
        let rx = self.snapshot_tx.subscribe();
        // A mutation racing the send above must still reach the new receiver.
        self.changed.notify_one();
        rx
    }

    /// Re-publish snapshots after mutations until `cancel` fires, then
    /// send one final snapshot.
    ///
    /// Bursts of mutations coalesce into one snapshot. A mutation made while
    /// a snapshot is being built re-arms the publisher.
    pub async fn run_publisher(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.changed.notified() => self.send_current(),
            }
        }
        self.send_current();
        debug!("diagnostics publisher stopped");
    }

    fn send_current(&self) {
        if self.snapshot_tx.receiver_count() > 0 {
            self.snapshot_tx.send_replace(self.snapshot());
        }
    }

    fn publish(&self) {
        self.changed.notify_one();
    }
}

impl Default for DiagnosticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::ConnectionState;

    #[test]
    fn each_outcome_increments_one_counter() {
        let diag = DiagnosticsAggregator::new();
        diag.record(ClassificationOutcome::Accepted {
            matched_keyword: true,
        });
        diag.record(ClassificationOutcome::Accepted {
            matched_keyword: false,
        });
        diag.record(ClassificationOutcome::RejectedUnsupportedSource);
        diag.record(ClassificationOutcome::RejectedGroupSummary);
        diag.record(ClassificationOutcome::RejectedNoKeywordByPolicy);
        diag.record(ClassificationOutcome::RejectedNoKeywordByPolicy);

        let snap = diag.snapshot();
        assert_eq!(snap.total_emitted, 2);
        assert_eq!(snap.emitted_by_keyword, 1);
        assert_eq!(snap.emitted_without_keyword, 1);
        assert_eq!(snap.skipped_unsupported_package, 1);
        assert_eq!(snap.skipped_group_summary, 1);
        assert_eq!(snap.skipped_no_keywords_by_config, 2);
        assert_eq!(snap.total_received(), 6);
    }

    #[test]
    fn removals_do_not_touch_classification_counters() {
        let diag = DiagnosticsAggregator::new();
        diag.record_removed();
        let snap = diag.snapshot();
        assert_eq!(snap.notifications_removed, 1);
        assert_eq!(snap.total_received(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_republished_snapshots() {
        let diag = Arc::new(DiagnosticsAggregator::new());
        let cancel = CancellationToken::new();
        let publisher = tokio::spawn(Arc::clone(&diag).run_publisher(cancel.clone()));
        let mut rx = diag.subscribe();
        assert_eq!(rx.borrow_and_update().total_emitted, 0);

        diag.record(ClassificationOutcome::Accepted {
            matched_keyword: true,
        });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().emitted_by_keyword, 1);

        diag.record_reconnect_attempts(2);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().reconnect_attempts, 2);

        cancel.cancel();
        publisher.await.unwrap();
    }

    #[test]
    fn mutations_do_not_wait_for_readers() {
        let diag = Arc::new(DiagnosticsAggregator::new());
        let rx = diag.subscribe();
        let held = rx.borrow();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let writer = Arc::clone(&diag);
        let handle = std::thread::spawn(move || {
            writer.record(ClassificationOutcome::Accepted {
                matched_keyword: true,
            });
            writer.record_removed();
            done_tx.send(()).unwrap();
        });

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(held.total_emitted, 0);
        drop(held);
        handle.join().unwrap();
        assert_eq!(diag.snapshot().emitted_by_keyword, 1);
    }

    #[tokio::test]
    async fn publisher_sends_final_snapshot_on_cancel() {
        let diag = Arc::new(DiagnosticsAggregator::new());
        let cancel = CancellationToken::new();
        let mut rx = diag.subscribe();

        diag.record_removed();
        cancel.cancel();
        Arc::clone(&diag).run_publisher(cancel).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().notifications_removed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connected_time_advances_while_connected() {
        let diag = DiagnosticsAggregator::new();
        let record = ConnectionRecord {
            state: ConnectionState::Connected,
            connected_since: Some(Instant::now()),
            accumulated: Duration::from_secs(10),
            connect_count: 2,
            disconnect_count: 1,
            ..ConnectionRecord::default()
        };
        diag.record_connection_transition(Arc::new(record));

        tokio::time::advance(Duration::from_secs(5)).await;
        let snap = diag.snapshot();
        assert!(snap.is_connected());
        assert_eq!(snap.total_connected_ms, 15_000);
        assert_eq!(snap.connect_count, 2);
        assert_eq!(snap.disconnect_count, 1);
    }
}
