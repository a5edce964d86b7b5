use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::error;

/// Converts a wall-clock time into milliseconds since the UNIX epoch.
/// Times before the epoch are reported as `ClockNotReady`, which is
/// what a freshly booted box with no RTC tends to produce.
pub fn system_time_to_unix_millis(t: SystemTime) -> Result<u64, TimeError> {
  match t.duration_since(UNIX_EPOCH) {
    Ok(t) => Ok(t.as_millis() as u64),
    Err(e) => {
      error!("Error determining the time in UNIX land: {:?}", e);
      Err(TimeError::ClockNotReady)
    }
  }
}

/// Error type for time functions.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeError {
  /// The clock isn't ready yet.
  #[error("Clock not ready")]
  ClockNotReady,
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn converts_to_millis() {
    let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
    assert_eq!(system_time_to_unix_millis(t), Ok(1_700_000_000_123));
  }

  #[test]
  fn rejects_pre_epoch() {
    let t = UNIX_EPOCH - Duration::from_secs(1);
    assert_eq!(system_time_to_unix_millis(t), Err(TimeError::ClockNotReady));
  }
}
