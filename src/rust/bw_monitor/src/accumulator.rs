use bw_utils::units::DownUpOrder;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Counters filled by the capture path between sampling ticks.
/// `bytes.down` is inbound, `bytes.up` is outbound.
#[derive(Debug, Clone)]
pub(crate) struct AccumulatorState {
    pub(crate) bytes: DownUpOrder<u64>,
    pub(crate) packets: u64,
    pub(crate) last_reset_at: SystemTime,
}

/// What a drain hands to the sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DrainedWindow {
    pub(crate) bytes: DownUpOrder<u64>,
    pub(crate) packets: u64,
    pub(crate) elapsed: Duration,
}

/// A tick that couldn't produce a sample for an endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum TickFault {
    #[error("no time has passed since the last drain")]
    ZeroElapsed,
    #[error("wall clock moved backwards by {by:?}; {unsampled_bytes} bytes dropped")]
    ClockWentBackwards { by: Duration, unsampled_bytes: u64 },
    #[error("registered but has no state")]
    MissingState,
}

impl AccumulatorState {
    pub(crate) fn new(now: SystemTime) -> Self {
        Self {
            bytes: DownUpOrder::zeroed(),
            packets: 0,
            last_reset_at: now,
        }
    }

    pub(crate) fn record_inbound(&mut self, length: u64) {
        self.bytes.checked_add_direct(length, 0);
        self.packets = self.packets.saturating_add(1);
    }

    pub(crate) fn record_outbound(&mut self, length: u64) {
        self.bytes.checked_add_direct(0, length);
        self.packets = self.packets.saturating_add(1);
    }

    /// Zero everything and start a fresh window at `now`.
    pub(crate) fn reset(&mut self, now: SystemTime) {
        self.bytes.set_to_zero();
        self.packets = 0;
        self.last_reset_at = now;
    }

    /// Read-and-zero the counters.
    ///
    /// With zero elapsed time the counters are left for the next drain. A
    /// backwards clock leaves the window with no usable length, so its
    /// counters are discarded (and reported in the fault) and a new window
    /// starts at `now`.
    pub(crate) fn drain(&mut self, now: SystemTime) -> Result<DrainedWindow, TickFault> {
        let elapsed = match now.duration_since(self.last_reset_at) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                let dropped = self.bytes.take();
                self.packets = 0;
                self.last_reset_at = now;
                return Err(TickFault::ClockWentBackwards {
                    by: e.duration(),
                    unsampled_bytes: dropped.down.saturating_add(dropped.up),
                });
            }
        };
        if elapsed.is_zero() {
            return Err(TickFault::ZeroElapsed);
        }
        let window = DrainedWindow {
            bytes: self.bytes.take(),
            packets: std::mem::take(&mut self.packets),
            elapsed,
        };
        self.last_reset_at = now;
        Ok(window)
    }
}
