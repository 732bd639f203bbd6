// ── Runtime pipeline configuration ──
//
// These types describe *how* the pipeline filters and heals itself.
// They never touch disk: `notiflow-config` (or any embedder) builds a
// `PipelineConfig` and hands it to `Pipeline::new`.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::CoreError;

/// Package name of the one payment source supported out of the box.
pub const ALIPAY_PACKAGE: &str = "com.eg.android.AlipayGphone";

/// Default per-subscriber buffer size of the event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Throttling for automatic and manual reconnection requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before each automatic attempt. Default: 15s.
    pub delay: Duration,

    /// Automatic attempts allowed per disconnection episode. Default: 3.
    pub max_attempts: u32,

    /// Window in which repeated manual requests are coalesced. Default: 15s.
    pub manual_window: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(15),
            max_attempts: 3,
            manual_window: Duration::from_secs(15),
        }
    }
}

// ── PipelineConfig ───────────────────────────────────────────────────

/// Configuration for a single notification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Source apps whose notifications are classified at all.
    pub supported_sources: HashSet<String>,
    /// Per-subscriber event bus capacity (rounded up to a power of two).
    pub bus_capacity: usize,
    /// Reconnection throttling.
    pub reconnect: ReconnectConfig,
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.bus_capacity == 0 {
            return Err(CoreError::Config {
                message: "bus_capacity must be greater than zero".into(),
            });
        }
        if self.supported_sources.is_empty() {
            return Err(CoreError::Config {
                message: "supported_sources must name at least one source app".into(),
            });
        }
        if self.reconnect.delay.is_zero() {
            return Err(CoreError::Config {
                message: "reconnect delay must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            supported_sources: HashSet::from([ALIPAY_PACKAGE.to_owned()]),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(15));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.manual_window, Duration::from_secs(15));
    }

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.supported_sources.contains(ALIPAY_PACKAGE));
        assert_eq!(config.bus_capacity, 64);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = PipelineConfig {
            bus_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn empty_sources_are_rejected() {
        let config = PipelineConfig {
            supported_sources: HashSet::new(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }
}
