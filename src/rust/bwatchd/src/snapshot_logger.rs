use anyhow::Result;
use bw_monitor::Monitor;
use bw_utils::packet_scale::scale_mbps;
use std::time::Duration;
use tracing::{debug, info};

/// Log every endpoint's latest rates once per `period`, forever.
pub fn run(monitor: &Monitor, period: Duration) -> Result<()> {
  loop {
    std::thread::sleep(period);
    log_snapshot(monitor)?;
  }
}

fn log_snapshot(monitor: &Monitor) -> Result<()> {
  let snapshot = monitor.snapshot_all();
  for sample in snapshot.iter() {
    // Removed between the two calls
    let Some(endpoint) = monitor.endpoint(&sample.address) else {
      continue;
    };
    if sample.has_data() {
      info!(
        "{} ({}): down {}, up {}",
        endpoint.display_name,
        sample.address,
        scale_mbps(sample.download_mbps),
        scale_mbps(sample.upload_mbps)
      );
    } else {
      info!("{} ({}): no data yet", endpoint.display_name, sample.address);
    }
  }
  debug!("{}", serde_json::to_string(&snapshot)?);
  debug!("{}", serde_json::to_string(&monitor.capture_stats())?);
  Ok(())
}
