use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;

/// Running counters kept by the capture path. Updated without taking the
/// monitor lock.
#[derive(Debug, Default)]
pub struct CaptureStats {
    frames_seen: AtomicU64,
    frames_attributed: AtomicU64,
    frames_unattributed: AtomicU64,
    frames_filtered: AtomicU64,
    frames_non_ip: AtomicU64,
    frames_malformed: AtomicU64,
    handler_faults: AtomicU64,
    read_errors: AtomicU64,
    bytes_unsampled: AtomicU64,
}

/// A copy of [`CaptureStats`] at one moment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStatsSnapshot {
    /// Frames handed to the packet handler
    pub frames_seen: u64,
    /// Frames credited to at least one endpoint
    pub frames_attributed: u64,
    /// IP frames that matched no endpoint
    pub frames_unattributed: u64,
    /// IP frames rejected by the packet filter
    pub frames_filtered: u64,
    /// Frames without a network-layer header
    pub frames_non_ip: u64,
    /// Frames that failed to parse
    pub frames_malformed: u64,
    /// Panics caught while reading or handling a frame
    pub handler_faults: u64,
    /// Errors reading from the capture
    pub read_errors: u64,
    /// Attributed bytes discarded because the wall clock stepped backwards
    pub bytes_unsampled: u64,
}

impl CaptureStats {
    pub(crate) fn seen(&self) {
        self.frames_seen.fetch_add(1, Relaxed);
    }

    pub(crate) fn attributed(&self) {
        self.frames_attributed.fetch_add(1, Relaxed);
    }

    pub(crate) fn unattributed(&self) {
        self.frames_unattributed.fetch_add(1, Relaxed);
    }

    pub(crate) fn filtered(&self) {
        self.frames_filtered.fetch_add(1, Relaxed);
    }

    pub(crate) fn non_ip(&self) {
        self.frames_non_ip.fetch_add(1, Relaxed);
    }

    pub(crate) fn malformed(&self) -> u64 {
        self.frames_malformed.fetch_add(1, Relaxed) + 1
    }

    pub(crate) fn handler_fault(&self) {
        self.handler_faults.fetch_add(1, Relaxed);
    }

    pub(crate) fn read_error(&self) -> u64 {
        self.read_errors.fetch_add(1, Relaxed) + 1
    }

    pub(crate) fn unsampled(&self, bytes: u64) {
        self.bytes_unsampled.fetch_add(bytes, Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            frames_seen: self.frames_seen.load(Relaxed),
            frames_attributed: self.frames_attributed.load(Relaxed),
            frames_unattributed: self.frames_unattributed.load(Relaxed),
            frames_filtered: self.frames_filtered.load(Relaxed),
            frames_non_ip: self.frames_non_ip.load(Relaxed),
            frames_malformed: self.frames_malformed.load(Relaxed),
            handler_faults: self.handler_faults.load(Relaxed),
            read_errors: self.read_errors.load(Relaxed),
            bytes_unsampled: self.bytes_unsampled.load(Relaxed),
        }
    }
}
