mod registry;
mod snapshot_logger;

use anyhow::{Context, Result};
use bw_config::Config;
use bw_monitor::capture::list_interfaces;
use bw_monitor::{CaptureError, Monitor, MonitorError, MonitorSettings};
use signal_hook::{
  consts::{SIGHUP, SIGINT, SIGTERM},
  iterator::Signals,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};

/// Configure a compact console logger.
pub fn set_console_logging() -> anyhow::Result<()> {
  // The level comes from RUST_LOG.
  let level = if let Ok(level) = std::env::var("RUST_LOG") {
    match level.to_lowercase().as_str() {
      "trace" => LevelFilter::TRACE,
      "debug" => LevelFilter::DEBUG,
      "info" => LevelFilter::INFO,
      "warn" => LevelFilter::WARN,
      "error" => LevelFilter::ERROR,
      _ => LevelFilter::WARN,
    }
  } else {
    LevelFilter::WARN
  };

  let subscriber = tracing_subscriber::fmt()
    .with_max_level(level)
    .compact()
    .with_file(true)
    .with_line_number(true)
    .with_thread_names(true)
    .with_target(false)
    .finish();

  tracing::subscriber::set_global_default(subscriber)?;
  Ok(())
}

fn main() -> Result<()> {
  set_console_logging()?;
  info!("bwatchd starting");

  let config = Config::load()
    .with_context(|| format!("Unable to load {}", Config::config_path().display()))?;
  let monitor = Arc::new(Monitor::new(MonitorSettings::from(&config.monitor)));
  let result = monitor.sync_endpoints(&registry::endpoints_from_config(&config)?);
  info!("Registered {} endpoints", result.added);

  if let Err(e) = monitor.start() {
    error!("Unable to start monitoring: {e}");
    if matches!(
      e,
      MonitorError::Capture(CaptureError::InterfaceUnavailable(_) | CaptureError::NoDefaultInterface)
    ) {
      for iface in list_interfaces() {
        warn!(
          "Available interface {} (up: {}, loopback: {}) {}",
          iface.name,
          iface.is_up,
          iface.is_loopback,
          iface.addresses.join(", ")
        );
      }
    }
    return Err(e.into());
  }

  // Handle signals
  let mut signals = Signals::new([SIGINT, SIGHUP, SIGTERM])?;
  let signal_monitor = monitor.clone();
  std::thread::Builder::new()
    .name("Signal Handler".to_string())
    .spawn(move || {
      for sig in signals.forever() {
        match sig {
          SIGINT | SIGTERM => {
            match sig {
              SIGINT => warn!("Terminating on SIGINT"),
              _ => warn!("Terminating on SIGTERM"),
            }
            if let Err(e) = signal_monitor.stop() {
              error!("Error stopping the monitor: {e}");
            }
            std::process::exit(0);
          }
          SIGHUP => {
            warn!("Reloading configuration because of SIGHUP");
            if let Err(e) = registry::reload(&signal_monitor) {
              warn!("Unable to reload configuration: {e:?}");
            }
          }
          _ => warn!("No handler for signal: {sig}"),
        }
      }
    })?;

  let period = Duration::from_secs(config.monitor.snapshot_log_seconds);
  if period.is_zero() {
    loop {
      std::thread::park();
    }
  }
  snapshot_logger::run(&monitor, period)
}
