//! Capture-side packet filter. Only address family selection is supported;
//! anything finer grained is outside what the attribution engine needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Which network-layer families are eligible for attribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PacketFilter {
    /// IPv4 and IPv6 (`"ip or ip6"`, or an empty string)
    #[default]
    AnyIp,
    /// IPv4 only (`"ip"`)
    Ipv4Only,
    /// IPv6 only (`"ip6"`)
    Ipv6Only,
}

impl PacketFilter {
    /// Does a packet between these addresses pass the filter?
    pub fn accepts(&self, addr: &IpAddr) -> bool {
        match self {
            PacketFilter::AnyIp => true,
            PacketFilter::Ipv4Only => addr.is_ipv4(),
            PacketFilter::Ipv6Only => addr.is_ipv6(),
        }
    }

    /// The canonical expression for this filter.
    pub fn expression(&self) -> &'static str {
        match self {
            PacketFilter::AnyIp => "ip or ip6",
            PacketFilter::Ipv4Only => "ip",
            PacketFilter::Ipv6Only => "ip6",
        }
    }
}

/// The filter expression isn't one we understand.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unsupported packet filter expression: '{0}' (expected \"ip\", \"ip6\" or \"ip or ip6\")")]
pub struct FilterError(pub String);

impl FromStr for PacketFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "" | "ip or ip6" | "ip6 or ip" => Ok(PacketFilter::AnyIp),
            "ip" => Ok(PacketFilter::Ipv4Only),
            "ip6" => Ok(PacketFilter::Ipv6Only),
            _ => Err(FilterError(s.to_string())),
        }
    }
}

impl TryFrom<String> for PacketFilter {
    type Error = FilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PacketFilter> for String {
    fn from(value: PacketFilter) -> Self {
        value.expression().to_string()
    }
}

impl fmt::Display for PacketFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expression())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn parses_known_expressions() {
        assert_eq!("".parse(), Ok(PacketFilter::AnyIp));
        assert_eq!("  IP   or ip6 ".parse(), Ok(PacketFilter::AnyIp));
        assert_eq!("ip".parse(), Ok(PacketFilter::Ipv4Only));
        assert_eq!("ip6".parse(), Ok(PacketFilter::Ipv6Only));
        assert!("tcp port 80".parse::<PacketFilter>().is_err());
    }

    #[test]
    fn filters_by_family() {
        let v4 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);
        assert!(PacketFilter::AnyIp.accepts(&v4) && PacketFilter::AnyIp.accepts(&v6));
        assert!(PacketFilter::Ipv4Only.accepts(&v4) && !PacketFilter::Ipv4Only.accepts(&v6));
        assert!(!PacketFilter::Ipv6Only.accepts(&v4) && PacketFilter::Ipv6Only.accepts(&v6));
    }
}
