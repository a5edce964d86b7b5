//! Passive per-endpoint bandwidth attribution.
//!
//! Captures link-layer traffic on the monitoring host, credits each packet's
//! length to the registered endpoint whose network-layer address it came
//! from (upload) or went to (download), and every sampling interval turns the
//! accumulated byte counts into a throughput sample kept in a bounded
//! per-endpoint history.
//!
//! ```no_run
//! use bw_monitor::{Monitor, MonitorSettings};
//!
//! let monitor = Monitor::new(MonitorSettings::default().with_interface("eth0"));
//! monitor.add("192.168.1.1".parse().unwrap(), None, Some("Living room AP".into()));
//! monitor.start().expect("capture needs CAP_NET_RAW");
//! for sample in monitor.snapshot_all() {
//!     println!("{} down {:.2} Mbps up {:.2} Mbps", sample.address, sample.download_mbps, sample.upload_mbps);
//! }
//! monitor.stop().unwrap();
//! ```

#![warn(missing_docs)]

mod accumulator;
/// Attaching to interfaces and reading frames.
pub mod capture;
mod endpoint;
/// Link-layer frame parsing.
pub mod frame;
mod history;
mod monitor;
mod sample;
mod settings;
mod tracker;
mod workers;

pub use bw_config::PacketFilter;
pub use bw_utils::HardwareAddress;
pub use capture::{CaptureBackend, CaptureError, CaptureStatsSnapshot, PacketSource};
pub use endpoint::Endpoint;
pub use frame::{parse_frame, FrameError, PacketSummary};
pub use monitor::{LifecycleState, Monitor, MonitorError, RegistrySync};
pub use sample::{AverageSample, PeakSample, SampleStatus, ThroughputSample};
pub use settings::{MonitorSettings, MIN_SAMPLING_INTERVAL};
