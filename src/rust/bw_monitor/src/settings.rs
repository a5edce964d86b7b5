use bw_config::{MonitorConfig, PacketFilter};
use std::time::Duration;

/// Sampling ticks faster than this would spin the sampler thread.
pub const MIN_SAMPLING_INTERVAL: Duration = Duration::from_millis(10);

/// Construction parameters for a [`crate::Monitor`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Time between sampling ticks
    pub sampling_interval: Duration,
    /// Samples retained per endpoint
    pub history_size: usize,
    /// Interface to capture on; `None` auto-detects
    pub interface: Option<String>,
    /// Address families to attribute
    pub packet_filter: PacketFilter,
    /// Samples above this rate are logged
    pub high_usage_threshold_mbps: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_secs(5),
            history_size: 60,
            interface: None,
            packet_filter: PacketFilter::AnyIp,
            high_usage_threshold_mbps: 50.0,
        }
    }
}

impl MonitorSettings {
    /// Set the sampling interval.
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval = interval;
        self
    }

    /// Set how many samples each endpoint keeps.
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    /// Capture on a named interface.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Restrict attribution to some address families.
    pub fn with_packet_filter(mut self, filter: PacketFilter) -> Self {
        self.packet_filter = filter;
        self
    }

    /// Set the high-usage logging threshold.
    pub fn with_high_usage_threshold(mut self, mbps: f64) -> Self {
        self.high_usage_threshold_mbps = mbps;
        self
    }

    /// Clamp values that would break the engine.
    pub(crate) fn sanitized(mut self) -> Self {
        self.sampling_interval = self.sampling_interval.max(MIN_SAMPLING_INTERVAL);
        self.history_size = self.history_size.max(1);
        if !self.high_usage_threshold_mbps.is_finite() || self.high_usage_threshold_mbps < 0.0 {
            self.high_usage_threshold_mbps = f64::MAX;
        }
        self
    }
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            sampling_interval: Duration::from_secs(cfg.sampling_interval_seconds),
            history_size: cfg.history_size,
            interface: cfg.interface.clone(),
            packet_filter: cfg.packet_filter,
            high_usage_threshold_mbps: cfg.high_usage_threshold_mbps,
        }
    }
}
