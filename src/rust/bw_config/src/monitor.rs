//! The `[monitor]` section: how to capture and how often to sample.

use crate::PacketFilter;
use serde::{Deserialize, Serialize};

fn default_sampling_interval() -> u64 {
    5
}

fn default_history_size() -> usize {
    60
}

fn default_high_usage_threshold() -> f64 {
    50.0
}

fn default_snapshot_log_seconds() -> u64 {
    30
}

/// Capture and sampling settings.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Interface to capture on. Auto-detected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    /// Address families to attribute.
    #[serde(default)]
    pub packet_filter: PacketFilter,

    /// Seconds between sampling ticks.
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval_seconds: u64,

    /// Samples retained per endpoint.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Samples above this rate (either direction) are logged.
    #[serde(default = "default_high_usage_threshold")]
    pub high_usage_threshold_mbps: f64,

    /// How often the daemon logs a snapshot of every endpoint. 0 disables it.
    #[serde(default = "default_snapshot_log_seconds")]
    pub snapshot_log_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interface: None,
            packet_filter: PacketFilter::default(),
            sampling_interval_seconds: default_sampling_interval(),
            history_size: default_history_size(),
            high_usage_threshold_mbps: default_high_usage_threshold(),
            snapshot_log_seconds: default_snapshot_log_seconds(),
        }
    }
}

impl MonitorConfig {
    /// Test if the monitor section is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.sampling_interval_seconds == 0 {
            return Err("sampling_interval_seconds must be at least 1".to_string());
        }
        if self.history_size == 0 {
            return Err("history_size must be at least 1".to_string());
        }
        if !self.high_usage_threshold_mbps.is_finite() || self.high_usage_threshold_mbps < 0.0 {
            return Err("high_usage_threshold_mbps must be a non-negative number".to_string());
        }
        if let Some(iface) = &self.interface {
            if iface.trim().is_empty() {
                return Err("interface may not be blank; omit it to auto-detect".to_string());
            }
        }
        Ok(())
    }
}
