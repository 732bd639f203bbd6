//! `replay`: drive a pipeline from recorded host callbacks.
//!
//! Input is JSON Lines, one callback per line:
//!
//! ```text
//! {"type":"connected"}
//! {"type":"posted","package_name":"com.eg.android.AlipayGphone","key":"0|1","extras":{"title":"支付宝","text":"收款到账 5.00 元"}}
//! {"type":"removed","key":"0|1"}
//! {"type":"disconnected"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use notiflow_config::FileConfigStore;
use notiflow_core::{
    DiagnosticsSnapshot, EventSource, EventSubscription, HostAccess, HostError, HostNotification,
    Pipeline, RawNotificationEvent, contains_any_keyword,
};

use crate::cli::{GlobalOpts, ReplayArgs};
use crate::error::CliError;
use crate::output;

const POLICY_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ── Input records ────────────────────────────────────────────────────

/// One recorded host callback.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Connected,
    Posted(HostNotification),
    Removed { key: String },
    Disconnected,
}

fn parse_line(line: &str, number: usize) -> Result<Option<Record>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| CliError::InvalidRecord {
            line: number,
            reason: e.to_string(),
        })
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, CliError> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

// ── Recording host ───────────────────────────────────────────────────

/// Host stand-in that counts reconnect requests.
#[derive(Debug, Default)]
struct ReplayHost {
    denied: bool,
    reconnects: AtomicU32,
}

impl HostAccess for ReplayHost {
    fn is_access_granted(&self) -> Result<bool, HostError> {
        Ok(!self.denied)
    }

    fn request_reconnect(&self) -> Result<(), HostError> {
        if self.denied {
            return Err(HostError::PermissionDenied);
        }
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        tracing::info!("host: listener reconnect requested");
        Ok(())
    }

    fn open_access_settings(&self) -> Result<(), HostError> {
        Err(unavailable("open_access_settings"))
    }

    fn open_channel_settings(&self, _channel_id: &str) -> Result<(), HostError> {
        Err(unavailable("open_channel_settings"))
    }
}

fn unavailable(operation: &str) -> HostError {
    HostError::Unavailable {
        operation: operation.into(),
        reason: "no settings UI during replay".into(),
    }
}

// ── Report ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ReplayReport {
    records: usize,
    access_granted: bool,
    reconnect_requests: u32,
    /// Events a subscriber could not keep up with.
    dropped_events: u64,
    events: Vec<Arc<RawNotificationEvent>>,
    diagnostics: DiagnosticsSnapshot,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Body")]
    body: String,
    #[tabled(rename = "Keyword")]
    keyword: &'static str,
    #[tabled(rename = "Summary")]
    summary: &'static str,
}

impl From<&RawNotificationEvent> for EventRow {
    fn from(e: &RawNotificationEvent) -> Self {
        let matched = contains_any_keyword(e.title.as_deref(), e.body.as_deref());
        Self {
            key: e.event_key.clone(),
            title: e.title.clone().unwrap_or_default(),
            body: e.body.clone().unwrap_or_default(),
            keyword: if matched { "yes" } else { "no" },
            summary: if e.is_group_summary { "yes" } else { "" },
        }
    }
}

fn detail(report: &ReplayReport, color: bool) -> String {
    let d = &report.diagnostics;
    let mut out = Vec::new();

    out.push(output::heading(
        &format!("Accepted events ({})", report.events.len()),
        color,
    ));
    if report.events.is_empty() {
        out.push("(none)".into());
    } else {
        let rows: Vec<EventRow> = report.events.iter().map(|e| EventRow::from(&**e)).collect();
        out.push(output::render_table(&rows));
    }

    out.push(String::new());
    out.push(output::heading("Diagnostics", color));
    let connected = Duration::from_millis(d.total_connected_ms);
    out.push(output::render_fields(&[
        ("Records replayed", report.records.to_string()),
        ("Received", d.total_received().to_string()),
        ("Emitted", d.total_emitted.to_string()),
        ("  by keyword", d.emitted_by_keyword.to_string()),
        ("  without keyword", d.emitted_without_keyword.to_string()),
        ("Skipped: unsupported source", d.skipped_unsupported_package.to_string()),
        ("Skipped: group summary", d.skipped_group_summary.to_string()),
        ("Skipped: no keyword", d.skipped_no_keywords_by_config.to_string()),
        ("Removed", d.notifications_removed.to_string()),
        ("Dropped by bus", report.dropped_events.to_string()),
        (
            "Connection",
            output::status(&d.connection.to_string(), d.is_connected(), color),
        ),
        ("Connects / disconnects", format!("{} / {}", d.connect_count, d.disconnect_count)),
        ("Connected for", humantime::format_duration(connected).to_string()),
        (
            "Access",
            output::status(
                if report.access_granted { "granted" } else { "denied" },
                report.access_granted,
                color,
            ),
        ),
        ("Reconnect attempts", d.reconnect_attempts.to_string()),
        ("Reconnect requests", report.reconnect_requests.to_string()),
    ]));

    out.join("\n")
}

// ── Handler ──────────────────────────────────────────────────────────

fn drain(sub: &mut EventSubscription, into: &mut Vec<Arc<RawNotificationEvent>>) {
    while let Some(event) = sub.try_recv() {
        into.push(event);
    }
}

pub async fn handle(args: ReplayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load(global)?;
    let host = Arc::new(ReplayHost {
        denied: args.access_denied,
        ..ReplayHost::default()
    });

    let pipeline = Pipeline::new(
        config.to_pipeline_config()?,
        Arc::clone(&host) as Arc<dyn HostAccess>,
    )?;
    // Policy comes from the same file and stays live while lingering.
    let store = FileConfigStore::open(super::config_path(global));
    pipeline.start(&store)?;
    let mut sub = pipeline.subscribe();

    let mut events = Vec::new();
    let mut records = 0;
    for (index, line) in open_input(&args.input)?.lines().enumerate() {
        let Some(record) = parse_line(&line?, index + 1)? else {
            continue;
        };
        records += 1;
        tracing::debug!(?record, "replaying");

        match record {
            Record::Connected => pipeline.on_connected(),
            Record::Posted(notification) => pipeline.on_notification_posted(notification),
            Record::Removed { key } => pipeline.on_notification_removed(&key),
            Record::Disconnected => pipeline.on_disconnected(),
        }
        drain(&mut sub, &mut events);
    }

    if !args.linger.is_zero() {
        tracing::info!(linger = ?args.linger, "waiting for scheduled reconnects");
        let cancel = CancellationToken::new();
        let poll = store.spawn_poll(POLICY_POLL_INTERVAL, cancel.clone());
        tokio::time::sleep(args.linger).await;
        cancel.cancel();
        let _ = poll.await;
    }
    pipeline.stop();
    drain(&mut sub, &mut events);

    let report = ReplayReport {
        records,
        access_granted: pipeline.is_access_granted(),
        reconnect_requests: host.reconnects.load(Ordering::Relaxed),
        dropped_events: sub.dropped(),
        events,
        diagnostics: pipeline.diagnostics_snapshot(),
    };

    let color = output::should_color(global.color);
    let out = output::render_single(global.output, &report, |r| detail(r, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
