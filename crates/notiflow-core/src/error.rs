// ── Core error types ──
//
// Nothing on the host callback path returns these. They surface only from
// lifecycle calls (`Pipeline::start`), configuration validation, and the
// host/config adapter boundaries, where they are reduced to booleans or
// default policy before they can reach the pipeline.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Pipeline already started")]
    AlreadyStarted,

    #[error("Pipeline must be started from within a tokio runtime")]
    NoRuntime,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Failure reported by a host adapter call.
///
/// Hosts return this from [`HostAccess`](crate::HostAccess) methods; the
/// pipeline logs it and reports `false` to its own callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Host operation '{operation}' unavailable: {reason}")]
    Unavailable { operation: String, reason: String },

    #[error("Notification access not granted")]
    PermissionDenied,
}

/// A configuration source could not produce a policy snapshot.
///
/// Carried inside [`PolicyUpdate`](crate::PolicyUpdate) values so that a
/// broken config file degrades to the default policy instead of stopping
/// the policy stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to read policy: {message}")]
pub struct ConfigReadError {
    pub message: String,
}

impl ConfigReadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
