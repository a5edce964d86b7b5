//! Packet capture abstraction.
//!
//! A `CaptureBackend` attaches to an interface and yields a `PacketSource`;
//! the monitor pulls raw frames from the source on its own capture thread.
//! `PnetBackend` is the live implementation; tests supply their own.

mod pnet_backend;
mod stats;

pub use pnet_backend::{list_interfaces, PnetBackend};
pub use stats::{CaptureStats, CaptureStatsSnapshot};

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Something that can attach to a network interface.
pub trait CaptureBackend: Send + Sync {
    /// Attach to `interface`, or to the default interface when `None`.
    fn open(&self, interface: Option<&str>) -> Result<Box<dyn PacketSource>, CaptureError>;
}

/// An attached capture, read from a single thread.
pub trait PacketSource: Send {
    /// The interface this source is attached to.
    fn interface_name(&self) -> &str;

    /// The next captured frame. `Ok(None)` means the read timed out with
    /// nothing to deliver; callers use that to check for shutdown.
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>>;
}

/// Reasons a capture can't be attached.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Usually a missing `CAP_NET_RAW`
    #[error("Permission denied opening a capture on {interface}: {source}")]
    PermissionDenied {
        /// Interface we tried to open
        interface: String,
        /// OS error
        source: io::Error,
    },
    /// No interface by that name
    #[error("Interface {0} is not available")]
    InterfaceUnavailable(String),
    /// Auto-detection found nothing usable
    #[error("No interface is up with an assigned address")]
    NoDefaultInterface,
    /// The interface doesn't provide an Ethernet channel
    #[error("Interface {0} does not provide an Ethernet capture channel")]
    UnsupportedChannel(String),
    /// Any other OS error while attaching
    #[error("Unable to open a capture on {interface}: {source}")]
    Io {
        /// Interface we tried to open
        interface: String,
        /// OS error
        source: io::Error,
    },
}

impl CaptureError {
    /// Classify an OS error from opening a capture.
    pub fn from_io(interface: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied {
                interface: interface.to_string(),
                source,
            },
            io::ErrorKind::NotFound => CaptureError::InterfaceUnavailable(interface.to_string()),
            _ => CaptureError::Io {
                interface: interface.to_string(),
                source,
            },
        }
    }
}

/// Just enough about an interface to pick a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Kernel name (`eth0`)
    pub name: String,
    /// Administratively up
    pub is_up: bool,
    /// Loopback device
    pub is_loopback: bool,
    /// Assigned network-layer addresses, as text
    pub addresses: Vec<String>,
}

/// The first interface that is up, isn't loopback, and has an address.
pub fn select_default_interface(interfaces: &[InterfaceInfo]) -> Option<&InterfaceInfo> {
    interfaces
        .iter()
        .find(|i| i.is_up && !i.is_loopback && !i.addresses.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, up: bool, lo: bool, addrs: &[&str]) -> InterfaceInfo {
        InterfaceInfo {
            name: name.to_string(),
            is_up: up,
            is_loopback: lo,
            addresses: addrs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn picks_first_usable_interface() {
        let list = vec![
            iface("lo", true, true, &["127.0.0.1/8"]),
            iface("eth0", false, false, &["192.168.1.5/24"]),
            iface("eth1", true, false, &[]),
            iface("wlan0", true, false, &["10.0.0.5/24"]),
            iface("eth2", true, false, &["10.1.0.5/24"]),
        ];
        assert_eq!(select_default_interface(&list).unwrap().name, "wlan0");
    }

    #[test]
    fn nothing_usable() {
        let list = vec![iface("lo", true, true, &["127.0.0.1/8"])];
        assert!(select_default_interface(&list).is_none());
    }

    #[test]
    fn classifies_os_errors() {
        let e = CaptureError::from_io("eth0", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(e, CaptureError::PermissionDenied { .. }));
        let e = CaptureError::from_io("eth9", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(e, CaptureError::InterfaceUnavailable(_)));
        let e = CaptureError::from_io("eth0", io::Error::from(io::ErrorKind::Other));
        assert!(matches!(e, CaptureError::Io { .. }));
    }
}
