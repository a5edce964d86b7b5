//! The two long-lived threads: capture and sampling. They share nothing but
//! the lock-guarded state in [`Shared`].

use crate::accumulator::TickFault;
use crate::capture::{CaptureStats, PacketSource};
use crate::frame::{parse_frame, PacketSummary};
use crate::settings::MonitorSettings;
use crate::tracker::{MonitorState, TickReport};
use bw_utils::packet_scale::scale_mbps;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Back-off after a failed capture read.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub(crate) struct Shared {
    pub(crate) settings: MonitorSettings,
    pub(crate) state: Mutex<MonitorState>,
    pub(crate) stats: CaptureStats,
}

impl Shared {
    pub(crate) fn new(settings: MonitorSettings) -> Self {
        Self {
            state: Mutex::new(MonitorState::new(settings.history_size)),
            stats: CaptureStats::default(),
            settings,
        }
    }

    /// The packet handler: parse, filter, attribute.
    pub(crate) fn handle_frame(&self, frame: &[u8]) {
        self.stats.seen();
        match parse_frame(frame) {
            Ok(Some(packet)) => self.handle_packet(&packet),
            Ok(None) => self.stats.non_ip(),
            Err(e) => {
                let n = self.stats.malformed();
                if n == 1 || n % 1000 == 0 {
                    debug!("Discarding malformed frame ({n} so far): {e}");
                }
            }
        }
    }

    pub(crate) fn handle_packet(&self, packet: &PacketSummary) {
        if !self.settings.packet_filter.accepts(&packet.source) {
            self.stats.filtered();
            return;
        }
        let attribution = self.state.lock().attribute(packet);
        if attribution.matched() {
            self.stats.attributed();
        } else {
            self.stats.unattributed();
        }
        for (address, mac) in attribution.learned.iter().flatten() {
            info!("Learned hardware address {mac} for {address}");
        }
    }

    /// One sampling tick. The lock covers only the drain and append; the
    /// report is logged after it is released.
    pub(crate) fn tick(&self, now: SystemTime) -> TickReport {
        let report = self
            .state
            .lock()
            .tick(now, self.settings.high_usage_threshold_mbps);
        for (address, fault) in report.faults.iter() {
            match fault {
                TickFault::ZeroElapsed => {
                    debug!("No time has passed for {address}; skipping this tick")
                }
                TickFault::ClockWentBackwards {
                    unsampled_bytes, ..
                } => {
                    self.stats.unsampled(*unsampled_bytes);
                    warn!("Unable to sample {address}: {fault}");
                }
                TickFault::MissingState => warn!("Unable to sample {address}: {fault}"),
            }
        }
        for busy in report.high_usage.iter() {
            info!(
                "High usage on {} ({}): down {}, up {}",
                busy.display_name,
                busy.address,
                scale_mbps(busy.download_mbps),
                scale_mbps(busy.upload_mbps),
            );
        }
        report
    }
}

/// A running thread plus the channel that tells it to stop.
pub(crate) struct Worker {
    name: &'static str,
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Signal the thread and wait for it. Returns false if it panicked.
    pub(crate) fn shutdown(self) -> bool {
        let _ = self.stop_tx.try_send(());
        drop(self.stop_tx);
        match self.handle.join() {
            Ok(()) => true,
            Err(_) => {
                error!("The {} thread panicked", self.name);
                false
            }
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    matches!(stop_rx.try_recv(), Ok(()) | Err(TryRecvError::Disconnected))
}

/// What one pass of the capture loop saw.
enum Poll {
    Handled,
    Idle,
    ReadError(std::io::Error),
}

/// Read at most one frame and run the packet handler on it.
fn poll_once(source: &mut dyn PacketSource, shared: &Shared) -> Poll {
    match source.next_frame() {
        Ok(Some(frame)) => {
            shared.handle_frame(frame);
            Poll::Handled
        }
        Ok(None) => Poll::Idle,
        Err(e) => Poll::ReadError(e),
    }
}

/// Spawn the capture thread. Every frame the source yields goes through
/// [`Shared::handle_frame`] exactly once. A panic while reading or handling
/// a frame is caught and counted so one bad frame can't end the capture.
pub(crate) fn spawn_capture(
    shared: Arc<Shared>,
    mut source: Box<dyn PacketSource>,
) -> std::io::Result<Worker> {
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let handle = std::thread::Builder::new()
        .name("Packet Capture".to_string())
        .spawn(move || {
            debug!("Capture thread started on {}", source.interface_name());
            while !stop_requested(&stop_rx) {
                match catch_unwind(AssertUnwindSafe(|| poll_once(source.as_mut(), &shared))) {
                    Ok(Poll::Handled | Poll::Idle) => {}
                    Ok(Poll::ReadError(e)) => {
                        let n = shared.stats.read_error();
                        if n == 1 || n % 100 == 0 {
                            warn!("Packet receive error ({n} so far): {e}");
                        }
                        std::thread::sleep(READ_ERROR_BACKOFF);
                    }
                    Err(_) => {
                        shared.stats.handler_fault();
                        warn!("Packet handler fault; frame discarded");
                    }
                }
            }
            debug!("Capture thread on {} exiting", source.interface_name());
        })?;
    Ok(Worker {
        name: "capture",
        stop_tx,
        handle,
    })
}

/// Spawn the sampling thread: one tick per `sampling_interval` until stopped.
pub(crate) fn spawn_sampler(shared: Arc<Shared>) -> std::io::Result<Worker> {
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let interval = shared.settings.sampling_interval;
    let handle = std::thread::Builder::new()
        .name("Throughput Sampler".to_string())
        .spawn(move || {
            debug!("Sampler thread started, ticking every {interval:?}");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let report = shared.tick(SystemTime::now());
                        if !report.faults.is_empty() {
                            debug!(
                                "Tick sampled {} endpoints, {} skipped",
                                report.sampled,
                                report.faults.len()
                            );
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Sampler thread exiting");
        })?;
    Ok(Worker {
        name: "sampler",
        stop_tx,
        handle,
    })
}
