use super::{select_default_interface, CaptureBackend, CaptureError, InterfaceInfo, PacketSource};
use pnet::datalink::{self, Channel, DataLinkReceiver, NetworkInterface};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

/// How long a read may block before the capture thread checks for shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Live capture through `pnet::datalink` (AF_PACKET on Linux).
#[derive(Debug, Clone)]
pub struct PnetBackend {
    promiscuous: bool,
}

impl Default for PnetBackend {
    fn default() -> Self {
        Self { promiscuous: true }
    }
}

impl PnetBackend {
    /// A backend that puts the interface into promiscuous mode, so traffic
    /// between other hosts on the segment is seen too.
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose whether to request promiscuous mode.
    pub fn with_promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    fn find_interface(name: Option<&str>) -> Result<NetworkInterface, CaptureError> {
        let interfaces = datalink::interfaces();
        match name {
            Some(name) => interfaces
                .into_iter()
                .find(|i| i.name == name)
                .ok_or_else(|| CaptureError::InterfaceUnavailable(name.to_string())),
            None => {
                let infos: Vec<InterfaceInfo> = interfaces.iter().map(interface_info).collect();
                let chosen = select_default_interface(&infos)
                    .ok_or(CaptureError::NoDefaultInterface)?
                    .name
                    .clone();
                info!(
                    "Auto-selected capture interface {chosen} ({})",
                    infos
                        .iter()
                        .find(|i| i.name == chosen)
                        .map(|i| i.addresses.join(", "))
                        .unwrap_or_default()
                );
                interfaces
                    .into_iter()
                    .find(|i| i.name == chosen)
                    .ok_or(CaptureError::NoDefaultInterface)
            }
        }
    }
}

impl CaptureBackend for PnetBackend {
    fn open(&self, interface: Option<&str>) -> Result<Box<dyn PacketSource>, CaptureError> {
        let iface = Self::find_interface(interface)?;
        debug!("Interface details: {:?}", iface);
        let config = datalink::Config {
            read_timeout: Some(READ_TIMEOUT),
            promiscuous: self.promiscuous,
            ..Default::default()
        };
        match datalink::channel(&iface, config) {
            Ok(Channel::Ethernet(_tx, rx)) => {
                info!("Capture attached to {}", iface.name);
                Ok(Box::new(PnetSource { name: iface.name, rx }))
            }
            Ok(_) => Err(CaptureError::UnsupportedChannel(iface.name)),
            Err(e) => Err(CaptureError::from_io(&iface.name, e)),
        }
    }
}

struct PnetSource {
    name: String,
    rx: Box<dyn DataLinkReceiver>,
}

impl PacketSource for PnetSource {
    fn interface_name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> io::Result<Option<&[u8]>> {
        match self.rx.next() {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn interface_info(iface: &NetworkInterface) -> InterfaceInfo {
    InterfaceInfo {
        name: iface.name.clone(),
        is_up: iface.is_up(),
        is_loopback: iface.is_loopback(),
        addresses: iface.ips.iter().map(|ip| ip.to_string()).collect(),
    }
}

/// Every interface the OS reports, for diagnostics and interface pickers.
pub fn list_interfaces() -> Vec<InterfaceInfo> {
    datalink::interfaces().iter().map(interface_info).collect()
}
