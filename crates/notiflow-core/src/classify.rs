// ── Notification classifier ──
//
// Pure accept/reject decision for one event under one policy snapshot.
// Callers record diagnostics from the returned outcome; nothing here
// logs, allocates shared state, or performs I/O.

use std::collections::HashSet;

use crate::model::{ClassificationOutcome, PolicySnapshot, RawNotificationEvent};

/// Payment-related keywords matched against title and body.
pub const PAYMENT_KEYWORDS: [&str; 13] = [
    "付款", "支付", "收款", "转账", "退款", "到账", "余额", "成功", "失败", "红包", "零钱",
    "银行卡", "信用卡",
];

/// Decide whether `event` should be published.
///
/// Rules are applied in order and the first match wins: unsupported
/// source, suppressed group summary, missing keyword under a strict
/// policy, then acceptance.
pub fn classify(
    event: &RawNotificationEvent,
    policy: &PolicySnapshot,
    supported_sources: &HashSet<String>,
) -> ClassificationOutcome {
    if !supported_sources.contains(&event.source_app) {
        return ClassificationOutcome::RejectedUnsupportedSource;
    }

    if event.is_group_summary && !policy.emit_group_summaries {
        return ClassificationOutcome::RejectedGroupSummary;
    }

    let matched = contains_any_keyword(event.title.as_deref(), event.body.as_deref());
    if !matched && !policy.emit_without_keyword_match {
        return ClassificationOutcome::RejectedNoKeywordByPolicy;
    }

    ClassificationOutcome::Accepted {
        matched_keyword: matched,
    }
}

/// Case-insensitive substring match of title and body against
/// [`PAYMENT_KEYWORDS`].
pub fn contains_any_keyword(title: Option<&str>, body: Option<&str>) -> bool {
    let content = format!("{} {}", title.unwrap_or_default(), body.unwrap_or_default()).to_lowercase();
    PAYMENT_KEYWORDS
        .iter()
        .any(|keyword| content.contains(&keyword.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALIPAY_PACKAGE;

    fn sources() -> HashSet<String> {
        HashSet::from([ALIPAY_PACKAGE.to_owned()])
    }

    fn strict() -> PolicySnapshot {
        PolicySnapshot {
            emit_without_keyword_match: false,
            ..PolicySnapshot::default()
        }
    }

    #[test]
    fn unsupported_source_is_rejected_first() {
        let event = RawNotificationEvent::new("com.tencent.mm", "k1")
            .with_title("付款成功")
            .with_group_summary(true);
        assert_eq!(
            classify(&event, &strict(), &sources()),
            ClassificationOutcome::RejectedUnsupportedSource
        );
    }

    #[test]
    fn keyword_in_title_is_accepted_under_strict_policy() {
        let event = RawNotificationEvent::new(ALIPAY_PACKAGE, "k1").with_title("付款成功");
        assert_eq!(
            classify(&event, &strict(), &sources()),
            ClassificationOutcome::Accepted {
                matched_keyword: true
            }
        );
    }

    #[test]
    fn keyword_in_body_is_matched() {
        let event = RawNotificationEvent::new(ALIPAY_PACKAGE, "k1")
            .with_title("支付宝")
            .with_body("你有一笔转账待确认");
        assert!(matches!(
            classify(&event, &strict(), &sources()),
            ClassificationOutcome::Accepted {
                matched_keyword: true
            }
        ));
    }

    #[test]
    fn no_keyword_is_rejected_under_strict_policy() {
        let event = RawNotificationEvent::new(ALIPAY_PACKAGE, "k1")
            .with_title("会员权益")
            .with_body("本周福利已更新");
        assert_eq!(
            classify(&event, &strict(), &sources()),
            ClassificationOutcome::RejectedNoKeywordByPolicy
        );
    }

    #[test]
    fn no_keyword_is_accepted_under_default_policy() {
        let event = RawNotificationEvent::new(ALIPAY_PACKAGE, "k1").with_title("会员权益");
        assert_eq!(
            classify(&event, &PolicySnapshot::default(), &sources()),
            ClassificationOutcome::Accepted {
                matched_keyword: false
            }
        );
    }

    #[test]
    fn group_summary_is_rejected_unless_enabled() {
        let event = RawNotificationEvent::new(ALIPAY_PACKAGE, "k1")
            .with_title("付款成功")
            .with_group_summary(true);
        assert_eq!(
            classify(&event, &PolicySnapshot::default(), &sources()),
            ClassificationOutcome::RejectedGroupSummary
        );

        let permissive = PolicySnapshot {
            emit_group_summaries: true,
            ..PolicySnapshot::default()
        };
        assert_eq!(
            classify(&event, &permissive, &sources()),
            ClassificationOutcome::Accepted {
                matched_keyword: true
            }
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let policies = [
            PolicySnapshot::default(),
            strict(),
            PolicySnapshot {
                emit_without_keyword_match: false,
                emit_group_summaries: true,
                log_unmatched_sources: true,
            },
        ];
        let events = [
            RawNotificationEvent::new(ALIPAY_PACKAGE, "a").with_title("收款到账"),
            RawNotificationEvent::new(ALIPAY_PACKAGE, "b").with_body("nothing here"),
            RawNotificationEvent::new(ALIPAY_PACKAGE, "c").with_group_summary(true),
            RawNotificationEvent::new("org.example", "d").with_title("退款"),
        ];
        for policy in &policies {
            for event in &events {
                assert_eq!(
                    classify(event, policy, &sources()),
                    classify(event, policy, &sources())
                );
            }
        }
    }

    #[test]
    fn keyword_match_ignores_case_and_missing_fields() {
        assert!(!contains_any_keyword(None, None));
        assert!(contains_any_keyword(None, Some("红包来了")));
        assert!(!contains_any_keyword(Some("PAYMENT"), Some("received")));
    }
}
