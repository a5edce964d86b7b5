use anyhow::{anyhow, Result};
use bw_config::Config;
use bw_monitor::{Endpoint, Monitor, MonitorSettings};
use tracing::{info, warn};

/// Turn the configured endpoint list into registry entries.
pub fn endpoints_from_config(config: &Config) -> Result<Vec<Endpoint>> {
  config
    .endpoints
    .iter()
    .map(|entry| {
      Endpoint::try_from(entry).map_err(|e| anyhow!("Invalid endpoint {}: {e}", entry.address))
    })
    .collect()
}

/// Re-read the configuration and bring the registry in line with it.
/// Endpoint changes apply immediately; monitor settings need a restart.
pub fn reload(monitor: &Monitor) -> Result<()> {
  let config = Config::load()?;
  if MonitorSettings::from(&config.monitor) != *monitor.settings() {
    warn!("Monitor settings changed on disk; restart bwatchd to apply them");
  }
  let result = monitor.sync_endpoints(&endpoints_from_config(&config)?);
  info!(
    "Endpoints reloaded: {} added, {} updated, {} removed",
    result.added, result.updated, result.removed
  );
  Ok(())
}
