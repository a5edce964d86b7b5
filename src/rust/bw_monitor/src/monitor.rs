use crate::capture::{CaptureBackend, CaptureError, CaptureStatsSnapshot, PnetBackend};
use crate::endpoint::Endpoint;
use crate::frame::PacketSummary;
use crate::sample::{AverageSample, PeakSample, ThroughputSample};
use crate::settings::MonitorSettings;
use crate::workers::{spawn_capture, spawn_sampler, Shared, Worker};
use bw_utils::HardwareAddress;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Where the monitor is in its start/stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Not capturing, not sampling
    Stopped,
    /// Attaching the capture and spawning threads
    Starting,
    /// Capturing and sampling
    Running,
    /// Tearing down
    Stopping,
}

/// Failures surfaced by [`Monitor::start`] and [`Monitor::stop`].
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The capture couldn't be attached
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// A worker thread couldn't be created
    #[error("Unable to spawn the {0} thread: {1}")]
    Spawn(&'static str, std::io::Error),
    /// A worker thread died while running
    #[error("The {0} thread panicked")]
    WorkerPanicked(&'static str),
}

/// What [`Monitor::sync_endpoints`] changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySync {
    /// Addresses that were not registered before
    pub added: usize,
    /// Addresses already registered, metadata refreshed
    pub updated: usize,
    /// Addresses no longer wanted
    pub removed: usize,
}

struct Workers {
    interface: String,
    capture: Worker,
    sampler: Worker,
}

/// Passive per-endpoint bandwidth monitor.
///
/// Owns the endpoint registry, the per-endpoint accumulators and the
/// per-endpoint history behind a single lock. `start` attaches a capture and
/// starts the sampling tick; the query methods can be called at any time, from
/// any thread, and only ever return copies.
pub struct Monitor {
    shared: Arc<Shared>,
    backend: Arc<dyn CaptureBackend>,
    lifecycle: Mutex<LifecycleState>,
    /// Serializes `start` and `stop`.
    workers: Mutex<Option<Workers>>,
}

impl Monitor {
    /// A monitor that captures with `pnet`.
    pub fn new(settings: MonitorSettings) -> Self {
        Self::with_backend(settings, Arc::new(PnetBackend::new()))
    }

    /// A monitor with a caller-supplied capture backend.
    pub fn with_backend(settings: MonitorSettings, backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            shared: Arc::new(Shared::new(settings.sanitized())),
            backend,
            lifecycle: Mutex::new(LifecycleState::Stopped),
            workers: Mutex::new(None),
        }
    }

    /// The settings in effect (after clamping).
    pub fn settings(&self) -> &MonitorSettings {
        &self.shared.settings
    }

    /// Register an endpoint, or refresh an existing one's metadata without
    /// touching its history. Works whether or not the monitor is running.
    pub fn add(
        &self,
        address: IpAddr,
        hardware_address: Option<HardwareAddress>,
        display_name: Option<String>,
    ) {
        let added = self.shared.state.lock().add(
            address,
            hardware_address,
            display_name,
            SystemTime::now(),
        );
        if added {
            debug!("Registered endpoint {address}");
        } else {
            debug!("Updated endpoint {address}");
        }
    }

    /// Unregister an endpoint and discard its counters and history.
    /// Unknown addresses are ignored. Returns true if something was removed.
    pub fn remove(&self, address: &IpAddr) -> bool {
        let removed = self.shared.state.lock().remove(address);
        if removed {
            debug!("Removed endpoint {address}");
        }
        removed
    }

    /// Copies of every registered endpoint, in registry order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.shared.state.lock().endpoints()
    }

    /// A copy of one endpoint, if registered.
    pub fn endpoint(&self, address: &IpAddr) -> Option<Endpoint> {
        self.shared.state.lock().endpoint(address)
    }

    /// Make the registry match `wanted`: add or refresh every listed
    /// endpoint, remove everything else. History survives for endpoints that
    /// stay. A learned hardware address is kept unless `wanted` names one.
    pub fn sync_endpoints(&self, wanted: &[Endpoint]) -> RegistrySync {
        let now = SystemTime::now();
        let mut result = RegistrySync::default();
        let keep: HashSet<IpAddr> = wanted.iter().map(|e| e.address).collect();
        let mut state = self.shared.state.lock();
        let stale: Vec<IpAddr> = state
            .endpoints()
            .into_iter()
            .map(|e| e.address)
            .filter(|a| !keep.contains(a))
            .collect();
        for address in stale.iter() {
            state.remove(address);
            result.removed += 1;
        }
        for ep in wanted {
            let added = state.add(
                ep.address,
                ep.hardware_address,
                Some(ep.display_name.clone()),
                now,
            );
            if added {
                result.added += 1;
            } else {
                result.updated += 1;
            }
        }
        drop(state);
        debug!(
            "Registry synced: {} added, {} updated, {} removed",
            result.added, result.updated, result.removed
        );
        result
    }

    /// Where the monitor is in its start/stop cycle.
    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.lock()
    }

    fn set_lifecycle(&self, state: LifecycleState) {
        *self.lifecycle.lock() = state;
    }

    /// The interface the running capture is attached to.
    pub fn interface(&self) -> Option<String> {
        self.workers.lock().as_ref().map(|w| w.interface.clone())
    }

    /// Attach the capture and start sampling. Accumulators are zeroed first,
    /// so bytes seen before a previous `stop` never leak into the first new
    /// sample. Calling this while running does nothing.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut workers = self.workers.lock();
        if workers.is_some() {
            info!("Monitor is already running");
            return Ok(());
        }
        self.set_lifecycle(LifecycleState::Starting);
        self.shared.state.lock().reset_accumulators(SystemTime::now());

        let source = match self.backend.open(self.shared.settings.interface.as_deref()) {
            Ok(source) => source,
            Err(e) => {
                error!("Unable to attach packet capture: {e}");
                self.set_lifecycle(LifecycleState::Stopped);
                return Err(e.into());
            }
        };
        let interface = source.interface_name().to_string();

        let capture = match spawn_capture(self.shared.clone(), source) {
            Ok(worker) => worker,
            Err(e) => {
                error!("Unable to spawn the capture thread: {e}");
                self.set_lifecycle(LifecycleState::Stopped);
                return Err(MonitorError::Spawn("capture", e));
            }
        };
        let sampler = match spawn_sampler(self.shared.clone()) {
            Ok(worker) => worker,
            Err(e) => {
                error!("Unable to spawn the sampler thread: {e}");
                capture.shutdown();
                self.set_lifecycle(LifecycleState::Stopped);
                return Err(MonitorError::Spawn("sampler", e));
            }
        };

        let endpoint_count = self.shared.state.lock().len();
        info!(
            "Monitoring {endpoint_count} endpoints on {interface}, sampling every {:?}",
            self.shared.settings.sampling_interval
        );
        *workers = Some(Workers {
            interface,
            capture,
            sampler,
        });
        self.set_lifecycle(LifecycleState::Running);
        Ok(())
    }

    /// Detach the capture, then stop the sampler. When this returns no
    /// further packets are attributed and no further ticks run. Calling it
    /// while stopped does nothing.
    pub fn stop(&self) -> Result<(), MonitorError> {
        let mut workers = self.workers.lock();
        let Some(running) = workers.take() else {
            return Ok(());
        };
        self.set_lifecycle(LifecycleState::Stopping);
        let capture_name = running.capture.name();
        let sampler_name = running.sampler.name();
        let capture_ok = running.capture.shutdown();
        let sampler_ok = running.sampler.shutdown();
        self.set_lifecycle(LifecycleState::Stopped);
        info!("Monitor on {} stopped", running.interface);

        if !capture_ok {
            return Err(MonitorError::WorkerPanicked(capture_name));
        }
        if !sampler_ok {
            return Err(MonitorError::WorkerPanicked(sampler_name));
        }
        Ok(())
    }

    /// Run the packet handler on a raw Ethernet frame, exactly as the
    /// capture thread does.
    pub fn ingest_frame(&self, frame: &[u8]) {
        self.shared.handle_frame(frame);
    }

    /// Attribute an already-parsed packet.
    pub fn ingest(&self, packet: &PacketSummary) {
        self.shared.stats.seen();
        self.shared.handle_packet(packet);
    }

    /// Run one sampling tick as of `now`. Returns the number of samples
    /// produced.
    pub fn tick_at(&self, now: SystemTime) -> usize {
        self.shared.tick(now).sampled
    }

    /// Counters kept by the capture path.
    pub fn capture_stats(&self) -> CaptureStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Most recent sample, or the `NoData` sentinel.
    pub fn latest(&self, address: &IpAddr) -> ThroughputSample {
        self.shared.state.lock().latest(address)
    }

    /// The latest sample for every registered endpoint, in registry order.
    pub fn snapshot_all(&self) -> Vec<ThroughputSample> {
        self.shared.state.lock().snapshot_all()
    }

    /// Retained history, oldest first. With a limit, only the newest `limit`.
    pub fn history(&self, address: &IpAddr, limit: Option<usize>) -> Vec<ThroughputSample> {
        self.shared.state.lock().history(address, limit)
    }

    /// Mean rates over the trailing `minutes`.
    pub fn windowed_average(&self, address: &IpAddr, minutes: u64) -> AverageSample {
        self.windowed_average_at(address, minutes, SystemTime::now())
    }

    /// Mean rates over the `minutes` before `now`.
    pub fn windowed_average_at(
        &self,
        address: &IpAddr,
        minutes: u64,
        now: SystemTime,
    ) -> AverageSample {
        self.shared.state.lock().window_average(address, minutes, now)
    }

    /// Highest download and upload rates in retained history.
    pub fn peak(&self, address: &IpAddr) -> PeakSample {
        self.shared.state.lock().peak(address)
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping monitor during drop: {e}");
        }
    }
}
