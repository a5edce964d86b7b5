//! Extracts just enough from a captured link-layer frame to attribute it:
//! network-layer addresses, link-layer addresses and the frame length.

use bw_utils::HardwareAddress;
use pnet::packet::ethernet::{EtherType, EtherTypes, EthernetPacket};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::vlan::VlanPacket;
use pnet::packet::Packet;
use pnet::util::MacAddr;
use std::net::IpAddr;
use thiserror::Error;

/// The parts of a packet that matter for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSummary {
    /// Network-layer source
    pub source: IpAddr,
    /// Network-layer destination
    pub destination: IpAddr,
    /// Captured length in bytes
    pub length: u64,
    /// Link-layer source, when a link-layer header was present
    pub source_mac: Option<HardwareAddress>,
    /// Link-layer destination, when a link-layer header was present
    pub destination_mac: Option<HardwareAddress>,
}

impl PacketSummary {
    /// A summary with no link-layer information.
    pub fn new(source: IpAddr, destination: IpAddr, length: u64) -> Self {
        Self {
            source,
            destination,
            length,
            source_mac: None,
            destination_mac: None,
        }
    }

    /// Attach link-layer addresses.
    pub fn with_macs(mut self, source: HardwareAddress, destination: HardwareAddress) -> Self {
        self.source_mac = Some(source);
        self.destination_mac = Some(destination);
        self
    }
}

/// A frame that claimed to carry IP but couldn't be read.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Too short for the header it claims to carry
    #[error("Truncated {0} header")]
    Truncated(&'static str),
    /// Header fields are inconsistent
    #[error("Malformed {0} header")]
    Malformed(&'static str),
}

fn hardware(mac: MacAddr) -> HardwareAddress {
    let MacAddr(a, b, c, d, e, f) = mac;
    HardwareAddress::new([a, b, c, d, e, f])
}

/// Parse an Ethernet frame.
///
/// * `Ok(Some(_))` - an IPv4 or IPv6 packet, optionally inside one 802.1Q tag.
/// * `Ok(None)` - no network-layer header (ARP, LLDP, ...). Not attributable.
/// * `Err(_)` - the frame is damaged.
pub fn parse_frame(frame: &[u8]) -> Result<Option<PacketSummary>, FrameError> {
    let ethernet = EthernetPacket::new(frame).ok_or(FrameError::Truncated("ethernet"))?;
    let length = frame.len() as u64;
    let source_mac = hardware(ethernet.get_source());
    let destination_mac = hardware(ethernet.get_destination());

    let mut ethertype = ethernet.get_ethertype();
    let mut payload = ethernet.payload();
    if ethertype == EtherTypes::Vlan {
        let vlan = VlanPacket::new(payload).ok_or(FrameError::Truncated("802.1Q"))?;
        ethertype = vlan.get_ethertype();
        payload = &payload[VlanPacket::minimum_packet_size()..];
    }

    let Some((source, destination)) = network_addresses(ethertype, payload)? else {
        return Ok(None);
    };
    Ok(Some(
        PacketSummary::new(source, destination, length).with_macs(source_mac, destination_mac),
    ))
}

fn network_addresses(
    ethertype: EtherType,
    payload: &[u8],
) -> Result<Option<(IpAddr, IpAddr)>, FrameError> {
    match ethertype {
        EtherTypes::Ipv4 => {
            let ip = Ipv4Packet::new(payload).ok_or(FrameError::Truncated("IPv4"))?;
            if ip.get_version() != 4 || ip.get_header_length() < 5 {
                return Err(FrameError::Malformed("IPv4"));
            }
            if (ip.get_header_length() as usize) * 4 > payload.len() {
                return Err(FrameError::Truncated("IPv4"));
            }
            Ok(Some((
                IpAddr::V4(ip.get_source()),
                IpAddr::V4(ip.get_destination()),
            )))
        }
        EtherTypes::Ipv6 => {
            let ip = Ipv6Packet::new(payload).ok_or(FrameError::Truncated("IPv6"))?;
            if ip.get_version() != 6 {
                return Err(FrameError::Malformed("IPv6"));
            }
            Ok(Some((
                IpAddr::V6(ip.get_source()),
                IpAddr::V6(ip.get_destination()),
            )))
        }
        _ => Ok(None),
    }
}

/// Test and benchmark helpers that build frames by hand.
#[doc(hidden)]
pub mod build {
    use std::net::{Ipv4Addr, Ipv6Addr};

    /// An Ethernet + IPv4 frame padded to `total_len` bytes (minimum 34).
    pub fn ipv4_frame(
        src_mac: [u8; 6],
        dst_mac: [u8; 6],
        src: Ipv4Addr,
        dst: Ipv4Addr,
        total_len: usize,
    ) -> Vec<u8> {
        let mut frame = Vec::with_capacity(total_len.max(34));
        frame.extend_from_slice(&dst_mac);
        frame.extend_from_slice(&src_mac);
        frame.extend_from_slice(&[0x08, 0x00]);
        let ip_len = (total_len.max(34) - 14) as u16;
        frame.extend_from_slice(&[0x45, 0x00]);
        frame.extend_from_slice(&ip_len.to_be_bytes());
        frame.extend_from_slice(&[0, 0, 0x40, 0, 64, 17, 0, 0]);
        frame.extend_from_slice(&src.octets());
        frame.extend_from_slice(&dst.octets());
        frame.resize(total_len.max(34), 0);
        frame
    }

    /// An Ethernet + IPv6 frame padded to `total_len` bytes (minimum 54).
    pub fn ipv6_frame(
        src_mac: [u8; 6],
        dst_mac: [u8; 6],
        src: Ipv6Addr,
        dst: Ipv6Addr,
        total_len: usize,
    ) -> Vec<u8> {
        let mut frame = Vec::with_capacity(total_len.max(54));
        frame.extend_from_slice(&dst_mac);
        frame.extend_from_slice(&src_mac);
        frame.extend_from_slice(&[0x86, 0xdd]);
        let payload_len = (total_len.max(54) - 54) as u16;
        frame.extend_from_slice(&[0x60, 0, 0, 0]);
        frame.extend_from_slice(&payload_len.to_be_bytes());
        frame.extend_from_slice(&[17, 64]);
        frame.extend_from_slice(&src.octets());
        frame.extend_from_slice(&dst.octets());
        frame.resize(total_len.max(54), 0);
        frame
    }

    /// An ARP request; carries no network-layer header we attribute.
    pub fn arp_frame(src_mac: [u8; 6]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(42);
        frame.extend_from_slice(&[0xff; 6]);
        frame.extend_from_slice(&src_mac);
        frame.extend_from_slice(&[0x08, 0x06]);
        frame.resize(42, 0);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const A: [u8; 6] = [0x02, 0, 0, 0, 0, 0xaa];
    const B: [u8; 6] = [0x02, 0, 0, 0, 0, 0xbb];

    #[test]
    fn parses_ipv4() {
        let frame = ipv4_frame(A, B, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(8, 8, 8, 8), 100);
        let summary = parse_frame(&frame).unwrap().unwrap();
        assert_eq!(summary.source, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(summary.destination, IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
        assert_eq!(summary.length, 100);
        assert_eq!(summary.source_mac, Some(HardwareAddress::new(A)));
        assert_eq!(summary.destination_mac, Some(HardwareAddress::new(B)));
    }

    #[test]
    fn parses_ipv6() {
        let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
        let frame = ipv6_frame(A, B, src, dst, 200);
        let summary = parse_frame(&frame).unwrap().unwrap();
        assert_eq!(summary.source, IpAddr::V6(src));
        assert_eq!(summary.destination, IpAddr::V6(dst));
        assert_eq!(summary.length, 200);
    }

    #[test]
    fn unwraps_vlan_tag() {
        let plain = ipv4_frame(A, B, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 60);
        let mut tagged = plain[..12].to_vec();
        tagged.extend_from_slice(&[0x81, 0x00, 0x00, 0x0a]);
        tagged.extend_from_slice(&plain[12..]);
        let summary = parse_frame(&tagged).unwrap().unwrap();
        assert_eq!(summary.destination, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(summary.length, 64);
    }

    #[test]
    fn non_ip_is_skipped() {
        assert_eq!(parse_frame(&arp_frame(A)), Ok(None));
    }

    #[test]
    fn damaged_frames_are_errors() {
        assert_eq!(parse_frame(&[0u8; 6]), Err(FrameError::Truncated("ethernet")));
        let frame = ipv4_frame(A, B, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 34);
        assert_eq!(parse_frame(&frame[..20]), Err(FrameError::Truncated("IPv4")));
        let mut bad_version = frame.clone();
        bad_version[14] = 0x65;
        assert_eq!(parse_frame(&bad_version), Err(FrameError::Malformed("IPv4")));
    }
}
