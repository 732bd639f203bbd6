// ── Pipeline facade ──
//
// Owns the classifier inputs, event bus, diagnostics and connection
// health for one notification listener. The host drives it through the
// `EventSource` callbacks; consumers read through subscriptions and
// snapshots. Lifecycle is explicit: `new`, `start`, `stop`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::bus::{EventBus, EventSubscription};
use crate::classify::classify;
use crate::config::PipelineConfig;
use crate::config_store::{ConfigStore, PolicyUpdate};
use crate::diagnostics::DiagnosticsAggregator;
use crate::error::CoreError;
use crate::health::{ConnectionHealthTracker, ReconnectScheduler};
use crate::host::{AccessGate, HostAccess};
use crate::model::{
    ClassificationOutcome, ConnectionState, DiagnosticsSnapshot, HostNotification,
    PolicySnapshot, RawNotificationEvent,
};
use crate::source::EventSource;

// ── Pipeline ─────────────────────────────────────────────────────

/// The main entry point for hosts and consumers.
///
/// Cheaply cloneable via `Arc<PipelineInner>`. Callbacks never block and
/// never fail: classification runs inline, publishing is a bounded
/// non-blocking send, and counters are atomics whose snapshots are sent to
/// observers from a background task.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: PipelineConfig,
    policy: ArcSwap<PolicySnapshot>,
    bus: EventBus,
    diagnostics: Arc<DiagnosticsAggregator>,
    health: ConnectionHealthTracker,
    scheduler: Arc<ReconnectScheduler>,
    access: AccessGate,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl Pipeline {
    /// Create a pipeline. Does NOT start background work -- call
    /// [`start()`](Self::start) from within a tokio runtime.
    pub fn new(config: PipelineConfig, host: Arc<dyn HostAccess>) -> Result<Self, CoreError> {
        config.validate()?;

        let access = AccessGate::new(host);
        let cancel = CancellationToken::new();
        let diagnostics = Arc::new(DiagnosticsAggregator::new());
        let scheduler = Arc::new(ReconnectScheduler::new(
            config.reconnect.clone(),
            access.clone(),
            Arc::clone(&diagnostics),
            cancel.child_token(),
        ));
        let health = ConnectionHealthTracker::new(
            Arc::clone(&diagnostics),
            Arc::clone(&scheduler),
            access.clone(),
        );

        Ok(Self {
            inner: Arc::new(PipelineInner {
                bus: EventBus::new(config.bus_capacity),
                config,
                policy: ArcSwap::from_pointee(PolicySnapshot::default()),
                diagnostics,
                health,
                scheduler,
                access,
                cancel,
                started: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start observing `store` and enable reconnection timers.
    ///
    /// The store's current policy is applied before this returns; later
    /// updates are applied by a background task until [`stop()`](Self::stop).
    pub fn start(&self, store: &dyn ConfigStore) -> Result<(), CoreError> {
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(CoreError::AlreadyStarted);
        }

        self.inner.scheduler.attach(runtime.clone());

        let mut updates = store.observe();
        if let Some(Some(update)) = updates.next().now_or_never() {
            self.inner.apply_policy(update);
        }

        let inner = Arc::clone(&self.inner);
        let cancel = self.inner.cancel.clone();
        runtime.spawn(policy_task(inner, updates, cancel.clone()));
        runtime.spawn(Arc::clone(&self.inner.diagnostics).run_publisher(cancel));

        info!(
            sources = self.inner.config.supported_sources.len(),
            bus_capacity = self.inner.bus.capacity(),
            "notification pipeline started"
        );
        Ok(())
    }

    /// Tear down background work: policy watching, diagnostics publishing
    /// and pending reconnects. Tasks are cancelled, not awaited.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
        debug!("notification pipeline stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::Acquire) && !self.inner.cancel.is_cancelled()
    }

    // ── Observation ──────────────────────────────────────────────

    /// Subscribe to accepted events published from now on.
    pub fn subscribe(&self) -> EventSubscription {
        self.inner.bus.subscribe()
    }

    /// Subscribe to diagnostics snapshots. Updates flow between
    /// [`start()`](Self::start) and [`stop()`](Self::stop).
    pub fn diagnostics(&self) -> watch::Receiver<DiagnosticsSnapshot> {
        self.inner.diagnostics.subscribe()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.snapshot()
    }

    /// The policy the next classification will use.
    pub fn policy(&self) -> PolicySnapshot {
        **self.inner.policy.load()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.health.state()
    }

    // ── Access control ───────────────────────────────────────────

    pub fn is_access_granted(&self) -> bool {
        self.inner.access.is_access_granted()
    }

    /// Manually request a listener reconnect (throttled).
    pub fn request_reconnect(&self) -> bool {
        self.inner.scheduler.request_manual()
    }

    pub fn open_access_settings(&self) -> bool {
        self.inner.access.open_access_settings()
    }

    pub fn open_channel_settings(&self, channel_id: &str) -> bool {
        self.inner.access.open_channel_settings(channel_id)
    }
}

// ── Host callbacks ───────────────────────────────────────────────

impl EventSource for Pipeline {
    fn on_connected(&self) {
        self.inner.health.on_connected();
    }

    fn on_notification_posted(&self, notification: HostNotification) {
        let inner = &self.inner;
        let event = RawNotificationEvent::from(notification);
        let policy = inner.policy.load();
        let outcome = classify(&event, &policy, &inner.config.supported_sources);

        // Counted before publishing so a woken subscriber sees it in the snapshot.
        inner.diagnostics.record(outcome);

        match outcome {
            ClassificationOutcome::Accepted { matched_keyword } => {
                debug!(
                    key = %event.event_key,
                    source = %event.source_app,
                    matched_keyword,
                    "notification accepted"
                );
                if !inner.bus.publish(Arc::new(event)) {
                    debug!("event bus full, oldest buffered event dropped");
                }
            }
            ClassificationOutcome::RejectedUnsupportedSource => {
                if policy.log_unmatched_sources {
                    trace!(source = %event.source_app, "skipping unsupported source");
                }
            }
            ClassificationOutcome::RejectedGroupSummary => {
                trace!(key = %event.event_key, "skipping group summary");
            }
            ClassificationOutcome::RejectedNoKeywordByPolicy => {
                trace!(key = %event.event_key, "no payment keyword, skipped by policy");
            }
        }
    }

    fn on_notification_removed(&self, key: &str) {
        trace!(key, "notification removed");
        self.inner.diagnostics.record_removed();
    }

    fn on_disconnected(&self) {
        self.inner.health.on_disconnected();
    }
}

// ── Policy handling ──────────────────────────────────────────────

impl PipelineInner {
    fn apply_policy(&self, update: PolicyUpdate) {
        let policy = update.unwrap_or_else(|e| {
            warn!(error = %e, "policy read failed, falling back to defaults");
            PolicySnapshot::default()
        });

        let previous = self.policy.swap(Arc::new(policy));
        if previous.emit_without_keyword_match != policy.emit_without_keyword_match {
            info!(value = policy.emit_without_keyword_match, "policy updated: emit_without_keyword_match");
        }
        if previous.emit_group_summaries != policy.emit_group_summaries {
            info!(value = policy.emit_group_summaries, "policy updated: emit_group_summaries");
        }
        if previous.log_unmatched_sources != policy.log_unmatched_sources {
            info!(value = policy.log_unmatched_sources, "policy updated: log_unmatched_sources");
        }
    }
}

/// Apply policy updates until cancelled or the store goes away.
async fn policy_task(
    inner: Arc<PipelineInner>,
    mut updates: BoxStream<'static, PolicyUpdate>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = updates.next() => match update {
                Some(update) => inner.apply_policy(update),
                None => {
                    debug!("policy stream ended, keeping last policy");
                    break;
                }
            },
        }
    }
}
