// ── Filtering policy ──

use serde::{Deserialize, Serialize};

/// The runtime-tunable filtering flags, swapped as one unit.
///
/// Readers hold an `Arc<PolicySnapshot>` loaded from an `ArcSwap`, so a
/// classification call never sees a mix of old and new flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySnapshot {
    /// Pass events through even when no payment keyword matched.
    pub emit_without_keyword_match: bool,
    /// Pass group-summary notifications through.
    pub emit_group_summaries: bool,
    /// Trace every notification skipped for coming from an unsupported app.
    pub log_unmatched_sources: bool,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            emit_without_keyword_match: true,
            emit_group_summaries: false,
            log_unmatched_sources: false,
        }
    }
}
