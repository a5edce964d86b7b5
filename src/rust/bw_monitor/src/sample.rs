//! Plain data records handed to callers of the query API. None of these
//! hold references into the monitor; they are safe to keep, send and
//! serialize.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Does a record carry measured data, or is it the "nothing yet" sentinel?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    /// Computed from at least one sampling tick
    Ok,
    /// No history exists for this address (yet)
    NoData,
}

/// One endpoint's throughput over one sampling tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Endpoint this sample belongs to
    pub address: IpAddr,
    /// Wall-clock time the sample was produced
    #[serde(with = "unix_millis")]
    pub timestamp: SystemTime,
    /// Inbound rate in megabits per second
    pub download_mbps: f64,
    /// Outbound rate in megabits per second
    pub upload_mbps: f64,
    /// Bytes towards the endpoint in this interval
    pub inbound_bytes: u64,
    /// Bytes from the endpoint in this interval
    pub outbound_bytes: u64,
    /// Seconds since the previous drain
    pub elapsed_seconds: f64,
    /// Packets attributed in this interval
    pub packet_count: u64,
    /// `NoData` for the sentinel
    pub status: SampleStatus,
}

impl ThroughputSample {
    /// Convert one drained window into a sample. Rates are zero when the
    /// window has no duration.
    pub fn from_window(
        address: IpAddr,
        timestamp: SystemTime,
        inbound_bytes: u64,
        outbound_bytes: u64,
        packet_count: u64,
        elapsed: Duration,
    ) -> Self {
        let elapsed_seconds = elapsed.as_secs_f64();
        Self {
            address,
            timestamp,
            download_mbps: bytes_to_mbps(inbound_bytes, elapsed_seconds),
            upload_mbps: bytes_to_mbps(outbound_bytes, elapsed_seconds),
            inbound_bytes,
            outbound_bytes,
            elapsed_seconds,
            packet_count,
            status: SampleStatus::Ok,
        }
    }

    /// The zero-valued "nothing recorded" sentinel.
    pub fn no_data(address: IpAddr) -> Self {
        Self {
            address,
            timestamp: UNIX_EPOCH,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            inbound_bytes: 0,
            outbound_bytes: 0,
            elapsed_seconds: 0.0,
            packet_count: 0,
            status: SampleStatus::NoData,
        }
    }

    /// False for the sentinel.
    pub fn has_data(&self) -> bool {
        self.status == SampleStatus::Ok
    }
}

/// Mean rates over a trailing time window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AverageSample {
    /// Endpoint the average covers
    pub address: IpAddr,
    /// Width of the trailing window
    pub window_minutes: u64,
    /// Mean inbound rate
    pub download_mbps: f64,
    /// Mean outbound rate
    pub upload_mbps: f64,
    /// How many history entries fell in the window
    pub sample_count: usize,
    /// `NoData` when no entries fell in the window
    pub status: SampleStatus,
}

impl AverageSample {
    pub(crate) fn no_data(address: IpAddr, window_minutes: u64) -> Self {
        Self {
            address,
            window_minutes,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            sample_count: 0,
            status: SampleStatus::NoData,
        }
    }
}

/// The highest rates in retained history. The two maxima are independent
/// and need not come from the same sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakSample {
    /// Endpoint the peak covers
    pub address: IpAddr,
    /// Highest inbound rate
    pub download_mbps: f64,
    /// Highest outbound rate
    pub upload_mbps: f64,
    /// How many history entries were examined
    pub sample_count: usize,
    /// `NoData` when history is empty
    pub status: SampleStatus,
}

impl PeakSample {
    pub(crate) fn no_data(address: IpAddr) -> Self {
        Self {
            address,
            download_mbps: 0.0,
            upload_mbps: 0.0,
            sample_count: 0,
            status: SampleStatus::NoData,
        }
    }
}

/// bits / seconds / 1e6, clamped to a finite, non-negative value.
pub(crate) fn bytes_to_mbps(bytes: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 || !elapsed_seconds.is_finite() {
        return 0.0;
    }
    let mbps = (bytes as f64 * 8.0) / (1_000_000.0 * elapsed_seconds);
    if mbps.is_finite() { mbps.max(0.0) } else { 0.0 }
}

/// Serialize `SystemTime` as milliseconds since the epoch.
mod unix_millis {
    use bw_utils::unix_time::system_time_to_unix_millis;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(system_time_to_unix_millis(*t).unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_millis(ms))
    }
}
