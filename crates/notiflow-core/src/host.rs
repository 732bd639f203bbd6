// ── Host access surface ──
//
// The host owns notification-access permission and the settings screens.
// Its calls can fail for host reasons (no settings activity, service not
// bound); the pipeline only ever sees the boolean result.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::HostError;

/// Permission and settings-navigation calls implemented by the host.
pub trait HostAccess: Send + Sync {
    /// Whether the user currently grants notification access to the listener.
    fn is_access_granted(&self) -> Result<bool, HostError>;

    /// Ask the host to rebind the listener service.
    fn request_reconnect(&self) -> Result<(), HostError>;

    /// Open the host's notification-access settings.
    fn open_access_settings(&self) -> Result<(), HostError>;

    /// Open the settings of one of the app's notification channels.
    fn open_channel_settings(&self, channel_id: &str) -> Result<(), HostError>;
}

/// Boundary wrapper that reduces every host call to a `bool`.
///
/// Failures are logged here and never propagate into the pipeline.
#[derive(Clone)]
pub struct AccessGate {
    host: Arc<dyn HostAccess>,
}

impl AccessGate {
    pub fn new(host: Arc<dyn HostAccess>) -> Self {
        Self { host }
    }

    pub fn is_access_granted(&self) -> bool {
        self.host.is_access_granted().unwrap_or_else(|e| {
            warn!(error = %e, "access check failed, treating as not granted");
            false
        })
    }

    pub fn request_reconnect(&self) -> bool {
        reduce("request_reconnect", self.host.request_reconnect())
    }

    pub fn open_access_settings(&self) -> bool {
        reduce("open_access_settings", self.host.open_access_settings())
    }

    pub fn open_channel_settings(&self, channel_id: &str) -> bool {
        reduce(
            "open_channel_settings",
            self.host.open_channel_settings(channel_id),
        )
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

fn reduce(operation: &'static str, result: Result<(), HostError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(operation, error = %e, "host call failed");
            false
        }
    }
}
