use crate::sample::{AverageSample, PeakSample, SampleStatus, ThroughputSample};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// Bounded, oldest-evicted sample history for one endpoint.
#[derive(Debug, Clone)]
pub(crate) struct History {
    capacity: usize,
    samples: VecDeque<ThroughputSample>,
}

impl History {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, sample: ThroughputSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    pub(crate) fn latest(&self) -> Option<&ThroughputSample> {
        self.samples.back()
    }

    /// Oldest to newest. With a limit, only the newest `limit` entries.
    pub(crate) fn recent(&self, limit: Option<usize>) -> Vec<ThroughputSample> {
        let skip = match limit {
            Some(limit) => self.samples.len().saturating_sub(limit),
            None => 0,
        };
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// Mean of samples stamped no earlier than `now - minutes`.
    pub(crate) fn window_average(
        &self,
        address: IpAddr,
        minutes: u64,
        now: SystemTime,
    ) -> AverageSample {
        let window = Duration::from_secs(minutes.saturating_mul(60));
        let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);
        let (mut down, mut up, mut count) = (0.0, 0.0, 0usize);
        if minutes > 0 {
            for sample in self.samples.iter().filter(|s| s.timestamp >= cutoff && s.timestamp <= now) {
                down += sample.download_mbps;
                up += sample.upload_mbps;
                count += 1;
            }
        }
        if count == 0 {
            return AverageSample::no_data(address, minutes);
        }
        AverageSample {
            address,
            window_minutes: minutes,
            download_mbps: down / count as f64,
            upload_mbps: up / count as f64,
            sample_count: count,
            status: SampleStatus::Ok,
        }
    }

    pub(crate) fn peak(&self, address: IpAddr) -> PeakSample {
        if self.samples.is_empty() {
            return PeakSample::no_data(address);
        }
        let download_mbps = self
            .samples
            .iter()
            .map(|s| s.download_mbps)
            .fold(0.0, f64::max);
        let upload_mbps = self
            .samples
            .iter()
            .map(|s| s.upload_mbps)
            .fold(0.0, f64::max);
        PeakSample {
            address,
            download_mbps,
            upload_mbps,
            sample_count: self.samples.len(),
            status: SampleStatus::Ok,
        }
    }
}
