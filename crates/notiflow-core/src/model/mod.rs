// ── Pipeline domain model ──
//
// Immutable values that move through the pipeline: the host's raw
// notification, the event it becomes, the policy it is judged against,
// the verdict, and the diagnostics read model.

pub mod diagnostics;
pub mod notification;
pub mod outcome;
pub mod policy;

// ── Re-exports ──────────────────────────────────────────────────────

pub use diagnostics::{ConnectionState, DiagnosticsSnapshot};
pub use notification::{FLAG_GROUP_SUMMARY, HostNotification, RawNotificationEvent};
pub use outcome::ClassificationOutcome;
pub use policy::PolicySnapshot;
