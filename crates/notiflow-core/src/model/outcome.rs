// ── Classification outcome ──

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Verdict of the classifier for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ClassificationOutcome {
    Accepted { matched_keyword: bool },
    RejectedUnsupportedSource,
    RejectedGroupSummary,
    RejectedNoKeywordByPolicy,
}

impl ClassificationOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}
