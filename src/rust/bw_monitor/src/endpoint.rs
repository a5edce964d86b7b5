use bw_config::EndpointEntry;
use bw_utils::HardwareAddress;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A monitored device, identified by its network-layer address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Registry key.
    pub address: IpAddr,
    /// Link-layer address, if configured or learned from traffic.
    pub hardware_address: Option<HardwareAddress>,
    /// Human-readable label.
    pub display_name: String,
}

impl Endpoint {
    /// Build an endpoint, generating a display name if none is given.
    pub fn new(
        address: IpAddr,
        hardware_address: Option<HardwareAddress>,
        display_name: Option<String>,
    ) -> Self {
        let display_name = display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Self::generated_name(&address));
        Self {
            address,
            hardware_address,
            display_name,
        }
    }

    /// The name used when none was supplied.
    pub fn generated_name(address: &IpAddr) -> String {
        format!("Device {address}")
    }

    /// Record a link-layer address seen in traffic for this endpoint.
    /// Only writes when no address is known yet; broadcast, multicast and
    /// all-zero addresses are never learned. Returns true if it was stored.
    pub fn observe_hardware_address(&mut self, seen: HardwareAddress) -> bool {
        if self.hardware_address.is_some()
            || seen.is_zero()
            || seen.is_multicast()
        {
            return false;
        }
        self.hardware_address = Some(seen);
        true
    }
}

impl TryFrom<&EndpointEntry> for Endpoint {
    type Error = String;

    fn try_from(entry: &EndpointEntry) -> Result<Self, Self::Error> {
        Ok(Endpoint::new(
            entry.parse_address()?,
            entry.parse_hardware_address()?,
            entry.name.clone(),
        ))
    }
}
