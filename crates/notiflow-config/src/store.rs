// ── File-backed policy store ──
//
// Serves the `[policy]` section of a config file as a `ConfigStore`.
// `reload` re-reads the file (plus env overrides) and publishes the new
// policy, or a read error that the pipeline turns into the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::BoxStream;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use notiflow_core::{ConfigReadError, ConfigStore, PolicyUpdate, WatchConfigStore};

use crate::load_policy;

/// `ConfigStore` reading the policy from a TOML file.
#[derive(Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    inner: WatchConfigStore,
}

impl FileConfigStore {
    /// Open `path` and publish its current policy.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            inner: WatchConfigStore::default(),
        };
        store.reload();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The most recently published update.
    pub fn current(&self) -> PolicyUpdate {
        self.inner.current()
    }

    /// Re-read the file. Returns `false` if it could not be read.
    ///
    /// Unchanged values are not re-published.
    pub fn reload(&self) -> bool {
        let update = load_policy(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to read policy");
            ConfigReadError::new(e.to_string())
        });
        let ok = update.is_ok();

        if self.inner.current() == update {
            return ok;
        }
        match update {
            Ok(policy) => {
                debug!(path = %self.path.display(), ?policy, "policy reloaded");
                self.inner.set(policy);
            }
            Err(e) => self.inner.fail(e),
        }
        ok
    }

    /// Reload every `every` until `cancel` fires.
    pub fn spawn_poll(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = self.clone();
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; `open` already read the file.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        store.reload();
                    }
                }
            }
            debug!(path = %store.path.display(), "policy polling stopped");
        })
    }
}

impl ConfigStore for FileConfigStore {
    fn observe(&self) -> BoxStream<'static, PolicyUpdate> {
        self.inner.observe()
    }
}
