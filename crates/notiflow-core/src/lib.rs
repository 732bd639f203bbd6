// notiflow-core: Notification ingestion pipeline between a host listener and consumers.
//
// Host callbacks (`EventSource`) are classified against a hot-swappable
// policy, accepted events fan out over a bounded drop-oldest bus, and
// every outcome and connection transition lands in a diagnostics read
// model. Connection loss drives capped, throttled reconnection.

pub mod bus;
pub mod classify;
pub mod config;
pub mod config_store;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod host;
pub mod model;
pub mod pipeline;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{EventBus, EventStream, EventSubscription};
pub use classify::{PAYMENT_KEYWORDS, classify, contains_any_keyword};
pub use config::{ALIPAY_PACKAGE, DEFAULT_BUS_CAPACITY, PipelineConfig, ReconnectConfig};
pub use config_store::{ConfigStore, PolicyUpdate, WatchConfigStore};
pub use diagnostics::DiagnosticsAggregator;
pub use error::{ConfigReadError, CoreError, HostError};
pub use health::{ConnectionHealthTracker, ConnectionRecord, ReconnectScheduler};
pub use host::{AccessGate, HostAccess};
pub use pipeline::Pipeline;
pub use source::EventSource;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ClassificationOutcome, ConnectionState, DiagnosticsSnapshot, FLAG_GROUP_SUMMARY,
    HostNotification, PolicySnapshot, RawNotificationEvent,
};
