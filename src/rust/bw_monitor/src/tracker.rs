//! The monitor's shared state: registry, accumulators and history, kept
//! together so one lock covers all three.

use crate::accumulator::{AccumulatorState, TickFault};
use crate::endpoint::Endpoint;
use crate::frame::PacketSummary;
use crate::history::History;
use crate::sample::{AverageSample, PeakSample, ThroughputSample};
use bw_utils::HardwareAddress;
use fxhash::FxHashMap;
use std::net::IpAddr;
use std::time::SystemTime;

#[derive(Debug)]
pub(crate) struct TrackedEndpoint {
    pub(crate) endpoint: Endpoint,
    pub(crate) accumulator: AccumulatorState,
    pub(crate) history: History,
}

/// Which directions a packet was attributed in, and any hardware
/// addresses it taught us (at most one per side).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attribution {
    pub(crate) outbound: bool,
    pub(crate) inbound: bool,
    pub(crate) learned: [Option<(IpAddr, HardwareAddress)>; 2],
}

impl Attribution {
    pub(crate) fn matched(&self) -> bool {
        self.outbound || self.inbound
    }
}

/// A sample above the high-usage threshold.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HighUsage {
    pub(crate) display_name: String,
    pub(crate) address: IpAddr,
    pub(crate) download_mbps: f64,
    pub(crate) upload_mbps: f64,
}

/// Outcome of one sampling tick across all endpoints. Nothing is logged
/// while the state lock is held; the caller reports this afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct TickReport {
    pub(crate) sampled: usize,
    pub(crate) faults: Vec<(IpAddr, TickFault)>,
    pub(crate) high_usage: Vec<HighUsage>,
}

#[derive(Debug)]
pub(crate) struct MonitorState {
    history_size: usize,
    entries: FxHashMap<IpAddr, TrackedEndpoint>,
    /// Registry order (insertion order).
    order: Vec<IpAddr>,
}

impl MonitorState {
    pub(crate) fn new(history_size: usize) -> Self {
        Self {
            history_size: history_size.max(1),
            entries: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Insert a new endpoint, or update an existing one's metadata in place.
    /// Returns true if the address was new.
    pub(crate) fn add(
        &mut self,
        address: IpAddr,
        hardware_address: Option<HardwareAddress>,
        display_name: Option<String>,
        now: SystemTime,
    ) -> bool {
        if let Some(existing) = self.entries.get_mut(&address) {
            if hardware_address.is_some() {
                existing.endpoint.hardware_address = hardware_address;
            }
            if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
                existing.endpoint.display_name = name;
            }
            return false;
        }
        self.entries.insert(
            address,
            TrackedEndpoint {
                endpoint: Endpoint::new(address, hardware_address, display_name),
                accumulator: AccumulatorState::new(now),
                history: History::new(self.history_size),
            },
        );
        self.order.push(address);
        true
    }

    /// Drop an endpoint and everything recorded for it.
    pub(crate) fn remove(&mut self, address: &IpAddr) -> bool {
        if self.entries.remove(address).is_some() {
            self.order.retain(|a| a != address);
            true
        } else {
            false
        }
    }

    /// Add one packet's length to whichever endpoints it belongs to. A
    /// source match wins over a destination match for the same endpoint,
    /// so a packet is never counted twice for one device.
    pub(crate) fn attribute(&mut self, packet: &PacketSummary) -> Attribution {
        let mut result = Attribution::default();
        if let Some(tracked) = self.entries.get_mut(&packet.source) {
            tracked.accumulator.record_outbound(packet.length);
            if let Some(mac) = packet.source_mac {
                if tracked.endpoint.observe_hardware_address(mac) {
                    result.learned[0] = Some((packet.source, mac));
                }
            }
            result.outbound = true;
        }
        if packet.destination != packet.source {
            if let Some(tracked) = self.entries.get_mut(&packet.destination) {
                tracked.accumulator.record_inbound(packet.length);
                if let Some(mac) = packet.destination_mac {
                    if tracked.endpoint.observe_hardware_address(mac) {
                        result.learned[1] = Some((packet.destination, mac));
                    }
                }
                result.inbound = true;
            }
        }
        result
    }

    /// Zero every accumulator and start a fresh window at `now`.
    pub(crate) fn reset_accumulators(&mut self, now: SystemTime) {
        self.entries
            .values_mut()
            .for_each(|tracked| tracked.accumulator.reset(now));
    }

    /// Drain every endpoint's counters into a sample appended to its history.
    pub(crate) fn tick(&mut self, now: SystemTime, high_usage_mbps: f64) -> TickReport {
        let mut report = TickReport::default();
        for address in self.order.iter() {
            let Some(tracked) = self.entries.get_mut(address) else {
                report.faults.push((*address, TickFault::MissingState));
                continue;
            };
            let window = match tracked.accumulator.drain(now) {
                Ok(window) => window,
                Err(fault) => {
                    report.faults.push((*address, fault));
                    continue;
                }
            };
            let sample = ThroughputSample::from_window(
                *address,
                now,
                window.bytes.down,
                window.bytes.up,
                window.packets,
                window.elapsed,
            );
            if sample.download_mbps > high_usage_mbps || sample.upload_mbps > high_usage_mbps {
                report.high_usage.push(HighUsage {
                    display_name: tracked.endpoint.display_name.clone(),
                    address: *address,
                    download_mbps: sample.download_mbps,
                    upload_mbps: sample.upload_mbps,
                });
            }
            tracked.history.push(sample);
            report.sampled += 1;
        }
        report
    }

    pub(crate) fn endpoints(&self) -> Vec<Endpoint> {
        self.order
            .iter()
            .filter_map(|a| self.entries.get(a))
            .map(|t| t.endpoint.clone())
            .collect()
    }

    pub(crate) fn endpoint(&self, address: &IpAddr) -> Option<Endpoint> {
        self.entries.get(address).map(|t| t.endpoint.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn latest(&self, address: &IpAddr) -> ThroughputSample {
        self.entries
            .get(address)
            .and_then(|t| t.history.latest())
            .cloned()
            .unwrap_or_else(|| ThroughputSample::no_data(*address))
    }

    pub(crate) fn snapshot_all(&self) -> Vec<ThroughputSample> {
        self.order.iter().map(|a| self.latest(a)).collect()
    }

    pub(crate) fn history(&self, address: &IpAddr, limit: Option<usize>) -> Vec<ThroughputSample> {
        self.entries
            .get(address)
            .map(|t| t.history.recent(limit))
            .unwrap_or_default()
    }

    pub(crate) fn window_average(
        &self,
        address: &IpAddr,
        minutes: u64,
        now: SystemTime,
    ) -> AverageSample {
        match self.entries.get(address) {
            Some(t) => t.history.window_average(*address, minutes, now),
            None => AverageSample::no_data(*address, minutes),
        }
    }

    pub(crate) fn peak(&self, address: &IpAddr) -> PeakSample {
        match self.entries.get(address) {
            Some(t) => t.history.peak(*address),
            None => PeakSample::no_data(*address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleStatus;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn directions(a: &Attribution) -> (bool, bool) {
        (a.outbound, a.inbound)
    }

    #[test]
    fn attribution_by_direction() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(0));
        let out = state.attribute(&PacketSummary::new(ip("10.0.0.1"), ip("1.1.1.1"), 100));
        assert_eq!(directions(&out), (true, false));
        let inb = state.attribute(&PacketSummary::new(ip("1.1.1.1"), ip("10.0.0.1"), 300));
        assert_eq!(directions(&inb), (false, true));
        let none = state.attribute(&PacketSummary::new(ip("1.1.1.1"), ip("2.2.2.2"), 300));
        assert!(!none.matched());

        state.tick(at(1), f64::MAX);
        let s = state.latest(&ip("10.0.0.1"));
        assert_eq!(s.inbound_bytes, 300);
        assert_eq!(s.outbound_bytes, 100);
        assert_eq!(s.packet_count, 2);
    }

    #[test]
    fn source_match_wins_for_self_addressed_packets() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(0));
        let a = state.attribute(&PacketSummary::new(ip("10.0.0.1"), ip("10.0.0.1"), 64));
        assert_eq!(directions(&a), (true, false));
        state.tick(at(1), f64::MAX);
        let s = state.latest(&ip("10.0.0.1"));
        assert_eq!((s.inbound_bytes, s.outbound_bytes, s.packet_count), (0, 64, 1));
    }

    #[test]
    fn packet_between_two_endpoints_counts_for_both() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(0));
        state.add(ip("10.0.0.2"), None, None, at(0));
        let a = state.attribute(&PacketSummary::new(ip("10.0.0.1"), ip("10.0.0.2"), 64));
        assert_eq!(directions(&a), (true, true));
    }

    #[test]
    fn learns_hardware_addresses_from_matching_side() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(0));
        state.add(ip("10.0.0.2"), None, None, at(0));
        let src = HardwareAddress::new([2, 0, 0, 0, 0, 1]);
        let dst = HardwareAddress::new([2, 0, 0, 0, 0, 2]);
        let packet = PacketSummary::new(ip("10.0.0.1"), ip("10.0.0.2"), 64).with_macs(src, dst);
        let first = state.attribute(&packet);
        assert_eq!(
            first.learned,
            [Some((ip("10.0.0.1"), src)), Some((ip("10.0.0.2"), dst))]
        );
        assert_eq!(state.endpoint(&ip("10.0.0.1")).unwrap().hardware_address, Some(src));
        assert_eq!(state.endpoint(&ip("10.0.0.2")).unwrap().hardware_address, Some(dst));
        // Already known: nothing new to report.
        assert_eq!(state.attribute(&packet).learned, [None, None]);
    }

    #[test]
    fn re_adding_keeps_history_and_learned_mac() {
        let mut state = MonitorState::new(10);
        let mac = HardwareAddress::new([2, 0, 0, 0, 0, 1]);
        assert!(state.add(ip("10.0.0.1"), Some(mac), Some("AP".into()), at(0)));
        state.tick(at(5), f64::MAX);
        assert!(!state.add(ip("10.0.0.1"), None, Some("Renamed".into()), at(6)));
        let ep = state.endpoint(&ip("10.0.0.1")).unwrap();
        assert_eq!(ep.display_name, "Renamed");
        assert_eq!(ep.hardware_address, Some(mac));
        assert_eq!(state.history(&ip("10.0.0.1"), None).len(), 1);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn remove_discards_everything() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(0));
        state.tick(at(5), f64::MAX);
        assert!(state.remove(&ip("10.0.0.1")));
        assert!(!state.remove(&ip("10.0.0.1")));
        assert_eq!(state.latest(&ip("10.0.0.1")).status, SampleStatus::NoData);
        state.add(ip("10.0.0.1"), None, None, at(6));
        assert_eq!(state.latest(&ip("10.0.0.1")).status, SampleStatus::NoData);
        assert!(state.history(&ip("10.0.0.1"), None).is_empty());
    }

    #[test]
    fn registry_order_is_insertion_order() {
        let mut state = MonitorState::new(10);
        for a in ["10.0.0.3", "10.0.0.1", "10.0.0.2"] {
            state.add(ip(a), None, None, at(0));
        }
        state.remove(&ip("10.0.0.1"));
        let order: Vec<IpAddr> = state.snapshot_all().iter().map(|s| s.address).collect();
        assert_eq!(order, vec![ip("10.0.0.3"), ip("10.0.0.2")]);
    }

    #[test]
    fn zero_elapsed_tick_produces_no_sample() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, None, at(5));
        let report = state.tick(at(5), f64::MAX);
        assert_eq!(report.sampled, 0);
        assert_eq!(report.faults, vec![(ip("10.0.0.1"), TickFault::ZeroElapsed)]);
        assert!(state.history(&ip("10.0.0.1"), None).is_empty());
    }

    #[test]
    fn high_usage_is_reported_not_logged() {
        let mut state = MonitorState::new(10);
        state.add(ip("10.0.0.1"), None, Some("AP".into()), at(0));
        state.add(ip("10.0.0.2"), None, None, at(0));
        // 8 Mbps down over one second
        state.attribute(&PacketSummary::new(ip("1.1.1.1"), ip("10.0.0.1"), 1_000_000));
        let report = state.tick(at(1), 5.0);
        assert_eq!(report.sampled, 2);
        assert_eq!(report.high_usage.len(), 1);
        let busy = &report.high_usage[0];
        assert_eq!((busy.display_name.as_str(), busy.address), ("AP", ip("10.0.0.1")));
        assert!((busy.download_mbps - 8.0).abs() < 1e-9);
    }
}
