// ── Throttled reconnection ──
//
// Automatic attempts run as timer tasks on the pipeline's runtime: one
// episode per disconnection, `max_attempts` requests spaced `delay` apart.
// The episode generation and attempt count share one atomic word, so a
// successful connect (which bumps the generation and zeroes the count)
// turns any in-flight attempt into a no-op without locks.
//
// Manual requests are throttled separately: one effective request per
// `manual_window`, extra requests inside the window are coalesced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReconnectConfig;
use crate::diagnostics::DiagnosticsAggregator;
use crate::host::AccessGate;

const NO_EPISODE: u64 = u64::MAX;
const NEVER: u64 = u64::MAX;

fn pack(generation: u32, attempts: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(attempts)
}

fn unpack(word: u64) -> (u32, u32) {
    let generation = u32::try_from(word >> 32).unwrap_or(u32::MAX);
    let attempts = u32::try_from(word & u64::from(u32::MAX)).unwrap_or(u32::MAX);
    (generation, attempts)
}

/// Why an automatic attempt could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refused {
    /// The connection came back; the episode is over.
    Stale,
    /// The episode already used all of its attempts.
    Exhausted,
}

/// Issues capped automatic and throttled manual reconnect requests.
pub struct ReconnectScheduler {
    config: ReconnectConfig,
    access: AccessGate,
    diagnostics: Arc<DiagnosticsAggregator>,
    /// `generation << 32 | attempts` of the current episode.
    episode: AtomicU64,
    /// Generation of the running episode task, or `NO_EPISODE`.
    running: AtomicU64,
    /// Milliseconds since `origin` of the last effective manual request.
    last_manual: AtomicU64,
    origin: Instant,
    runtime: OnceLock<Handle>,
    cancel: CancellationToken,
}

impl ReconnectScheduler {
    pub fn new(
        config: ReconnectConfig,
        access: AccessGate,
        diagnostics: Arc<DiagnosticsAggregator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            access,
            diagnostics,
            episode: AtomicU64::new(pack(0, 0)),
            running: AtomicU64::new(NO_EPISODE),
            last_manual: AtomicU64::new(NEVER),
            origin: Instant::now(),
            runtime: OnceLock::new(),
            cancel,
        }
    }

    /// Bind the runtime that episode timers are spawned on.
    /// Returns `false` if a runtime was already attached.
    pub fn attach(&self, runtime: Handle) -> bool {
        self.runtime.set(runtime).is_ok()
    }

    /// Automatic attempts made since the last successful connect.
    pub fn attempts(&self) -> u32 {
        unpack(self.episode.load(Ordering::Acquire)).1
    }

    /// Start an episode unless one is already running or the cap is spent.
    pub fn schedule(self: &Arc<Self>) {
        let (generation, attempts) = unpack(self.episode.load(Ordering::Acquire));
        if attempts >= self.config.max_attempts {
            warn!(
                max_attempts = self.config.max_attempts,
                "reconnect limit reached, giving up on automatic reconnect"
            );
            return;
        }

        let Some(runtime) = self.runtime.get() else {
            warn!("pipeline not started, automatic reconnect skipped");
            return;
        };

        if self.running.swap(u64::from(generation), Ordering::AcqRel) == u64::from(generation) {
            debug!("reconnect episode already running, disconnect coalesced");
            return;
        }

        debug!(generation, attempts, "starting reconnect episode");
        runtime.spawn(Arc::clone(self).run_episode(generation));
    }

    /// Forget the current episode after a successful connect.
    pub fn reset(&self) {
        let _ = self
            .episode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (generation, _) = unpack(word);
                Some(pack(generation.wrapping_add(1), 0))
            });
        self.diagnostics.record_reconnect_attempts(0);
    }

    /// Manual reconnect, at most once per `manual_window`.
    ///
    /// Requests inside the window report success without reaching the host.
    /// Without notification access nothing is issued and `false` is returned.
    pub fn request_manual(&self) -> bool {
        if !self.access.is_access_granted() {
            warn!("manual reconnect refused: notification access not granted");
            return false;
        }

        let now = self.elapsed_ms();
        let window = u64::try_from(self.config.manual_window.as_millis()).unwrap_or(u64::MAX);
        let claimed = self
            .last_manual
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                (last == NEVER || now.saturating_sub(last) >= window).then_some(now)
            })
            .is_ok();

        if !claimed {
            debug!("manual reconnect coalesced into the current window");
            return true;
        }

        info!("manual reconnect requested");
        self.access.request_reconnect()
    }

    // ── Episode task ─────────────────────────────────────────────────

    async fn run_episode(self: Arc<Self>, generation: u32) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.delay) => {}
            }

            match self.claim_attempt(generation) {
                Ok(attempt) => {
                    self.diagnostics.record_reconnect_attempts(attempt);
                    info!(attempt, max_attempts = self.config.max_attempts, "requesting listener reconnect");
                    if !self.access.request_reconnect() {
                        warn!(attempt, "reconnect request rejected by host");
                    }
                    if attempt >= self.config.max_attempts {
                        warn!("reconnect limit reached, giving up on automatic reconnect");
                        break;
                    }
                }
                Err(Refused::Stale) => {
                    debug!(generation, "connection restored, reconnect episode ends");
                    break;
                }
                Err(Refused::Exhausted) => {
                    warn!("reconnect limit reached, giving up on automatic reconnect");
                    break;
                }
            }
        }

        let _ = self.running.compare_exchange(
            u64::from(generation),
            NO_EPISODE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Count one attempt for `generation`, returning its 1-based number.
    fn claim_attempt(&self, generation: u32) -> Result<u32, Refused> {
        let max = self.config.max_attempts;
        self.episode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                let (current, attempts) = unpack(word);
                (current == generation && attempts < max).then(|| pack(current, attempts + 1))
            })
            .map(|previous| unpack(previous).1 + 1)
            .map_err(|word| {
                if unpack(word).0 == generation {
                    Refused::Exhausted
                } else {
                    Refused::Stale
                }
            })
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX - 1)
    }
}
