//! `[[endpoints]]` entries: the devices to watch when the monitor starts.

use bw_utils::HardwareAddress;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One monitored device, as written in the configuration file.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct EndpointEntry {
    /// Network-layer address, e.g. `192.168.1.1`
    pub address: String,

    /// Optional link-layer address. If absent, it may be learned from traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_address: Option<String>,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EndpointEntry {
    /// Parse the `address` field.
    pub fn parse_address(&self) -> Result<IpAddr, String> {
        self.address
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a valid IP address", self.address))
    }

    /// Parse the `hardware_address` field, if one is present.
    pub fn parse_hardware_address(&self) -> Result<Option<HardwareAddress>, String> {
        match &self.hardware_address {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|e| format!("'{s}' is not a valid hardware address: {e}")),
        }
    }
}
