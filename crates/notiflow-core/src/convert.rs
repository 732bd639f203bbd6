// ── Host-to-domain conversions ──
//
// Bridges the host's raw notification structure into the pipeline's
// `RawNotificationEvent`. Content lives in the extras map; the body falls
// back from the main text to the expanded text to the sub text.

use serde_json::{Map, Value};

use crate::model::{HostNotification, RawNotificationEvent};

pub const EXTRA_TITLE: &str = "title";
pub const EXTRA_TEXT: &str = "text";
pub const EXTRA_BIG_TEXT: &str = "big_text";
pub const EXTRA_SUB_TEXT: &str = "sub_text";

// ── Helpers ────────────────────────────────────────────────────────

/// Read a string extra. Non-string values are ignored.
fn extra_str(extras: &Map<String, Value>, key: &str) -> Option<String> {
    extras.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn extract_body(extras: &Map<String, Value>) -> Option<String> {
    extra_str(extras, EXTRA_TEXT)
        .or_else(|| extra_str(extras, EXTRA_BIG_TEXT))
        .or_else(|| extra_str(extras, EXTRA_SUB_TEXT))
}

// ── HostNotification ───────────────────────────────────────────────

impl From<HostNotification> for RawNotificationEvent {
    fn from(n: HostNotification) -> Self {
        let is_group_summary = n.is_group_summary();
        Self {
            title: extra_str(&n.extras, EXTRA_TITLE),
            body: extract_body(&n.extras),
            source_app: n.package_name,
            extras: n.extras,
            posted_at_millis: n.post_time,
            event_key: n.key,
            group_key: n.group_key,
            is_group_summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::FLAG_GROUP_SUMMARY;

    fn host(extras: Value, flags: u32) -> HostNotification {
        let Value::Object(extras) = extras else {
            panic!("extras must be an object");
        };
        HostNotification {
            package_name: "com.eg.android.AlipayGphone".into(),
            key: "0|com.eg.android.AlipayGphone|1|null|10001".into(),
            group_key: Some("group".into()),
            post_time: 1_700_000_000_000,
            flags,
            extras,
        }
    }

    #[test]
    fn converts_title_and_text() {
        let event = RawNotificationEvent::from(host(
            json!({ "title": "付款成功", "text": "你已成功付款 12.00 元" }),
            0,
        ));
        assert_eq!(event.source_app, "com.eg.android.AlipayGphone");
        assert_eq!(event.title.as_deref(), Some("付款成功"));
        assert_eq!(event.body.as_deref(), Some("你已成功付款 12.00 元"));
        assert_eq!(event.posted_at_millis, 1_700_000_000_000);
        assert_eq!(event.group_key.as_deref(), Some("group"));
        assert!(!event.is_group_summary);
    }

    #[test]
    fn body_falls_back_to_big_text_then_sub_text() {
        let event = RawNotificationEvent::from(host(json!({ "big_text": "expanded" }), 0));
        assert_eq!(event.body.as_deref(), Some("expanded"));

        let event = RawNotificationEvent::from(host(json!({ "sub_text": "sub" }), 0));
        assert_eq!(event.body.as_deref(), Some("sub"));

        let event = RawNotificationEvent::from(host(json!({ "title": 42 }), 0));
        assert!(event.title.is_none());
        assert!(event.body.is_none());
    }

    #[test]
    fn group_summary_flag_is_detected() {
        let event = RawNotificationEvent::from(host(json!({}), FLAG_GROUP_SUMMARY | 0x10));
        assert!(event.is_group_summary);
    }

    #[test]
    fn extras_pass_through_untouched() {
        let event = RawNotificationEvent::from(host(
            json!({ "title": "t", "android.extra": { "nested": [1, 2] } }),
            0,
        ));
        assert_eq!(event.extras["android.extra"]["nested"][1], 2);
    }
}
