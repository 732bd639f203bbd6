// ── Reactive policy source ──
//
// Any configuration backend (file, remote flags, env) that can push
// `PolicySnapshot`s satisfies `ConfigStore`. Read failures travel through
// the stream as values so the pipeline can fall back to the defaults
// without the stream ending.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::ConfigReadError;
use crate::model::PolicySnapshot;

/// One observation from a configuration source.
pub type PolicyUpdate = Result<PolicySnapshot, ConfigReadError>;

/// External reactive source of filtering policy.
pub trait ConfigStore: Send + Sync {
    /// Stream of policy updates, starting with the current value.
    fn observe(&self) -> BoxStream<'static, PolicyUpdate>;
}

/// In-memory `ConfigStore` backed by a `watch` channel.
///
/// Cheaply cloneable; every clone publishes into the same channel.
#[derive(Clone)]
pub struct WatchConfigStore {
    tx: Arc<watch::Sender<PolicyUpdate>>,
}

impl WatchConfigStore {
    pub fn new(initial: PolicySnapshot) -> Self {
        let (tx, _) = watch::channel(Ok(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new policy.
    pub fn set(&self, policy: PolicySnapshot) {
        self.tx.send_modify(|current| *current = Ok(policy));
    }

    /// Publish a read failure.
    pub fn fail(&self, error: ConfigReadError) {
        self.tx.send_modify(|current| *current = Err(error));
    }

    /// The most recently published update.
    pub fn current(&self) -> PolicyUpdate {
        self.tx.borrow().clone()
    }
}

impl Default for WatchConfigStore {
    fn default() -> Self {
        Self::new(PolicySnapshot::default())
    }
}

impl ConfigStore for WatchConfigStore {
    fn observe(&self) -> BoxStream<'static, PolicyUpdate> {
        WatchStream::new(self.tx.subscribe()).boxed()
    }
}
