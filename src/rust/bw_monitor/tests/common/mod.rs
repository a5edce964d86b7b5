//! A capture backend fed from a channel, so the monitor's threads can be
//! exercised without privileges or a real interface.

#![allow(dead_code)]

use bw_monitor::{CaptureBackend, CaptureError, PacketSource};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// What the mock source yields on its next read.
pub enum MockEvent {
    Frame(Vec<u8>),
    ReadError(io::ErrorKind),
    /// The read itself panics.
    Panic,
}

impl From<Vec<u8>> for MockEvent {
    fn from(frame: Vec<u8>) -> Self {
        MockEvent::Frame(frame)
    }
}

pub enum MockMode {
    Frames,
    PermissionDenied,
    NoSuchInterface,
}

pub struct MockBackend {
    mode: MockMode,
    pub opens: AtomicUsize,
    frames: Mutex<Option<Receiver<MockEvent>>>,
}

impl MockBackend {
    /// A backend plus the sender that feeds its (single) capture.
    pub fn new() -> (Arc<Self>, Sender<MockEvent>) {
        let (tx, rx) = unbounded();
        (
            Arc::new(Self {
                mode: MockMode::Frames,
                opens: AtomicUsize::new(0),
                frames: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }

    pub fn failing(mode: MockMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            opens: AtomicUsize::new(0),
            frames: Mutex::new(None),
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for MockBackend {
    fn open(&self, interface: Option<&str>) -> Result<Box<dyn PacketSource>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let name = interface.unwrap_or("mock0").to_string();
        match self.mode {
            MockMode::PermissionDenied => Err(CaptureError::PermissionDenied {
                interface: name,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }),
            MockMode::NoSuchInterface => Err(CaptureError::InterfaceUnavailable(name)),
            MockMode::Frames => {
                // Each open after the first gets a source with no traffic.
                let rx = self.frames.lock().take().unwrap_or_else(|| unbounded().1);
                Ok(Box::new(MockSource {
                    name,
                    rx,
                    current: Vec::new(),
                }))
            }
        }
    }
}

struct MockSource {
    name: String,
    rx: Receiver<MockEvent>,
    current: Vec<u8>,
}

impl PacketSource for MockSource {
    fn interface_name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> io::Result<Option<&[u8]>> {
        match self.rx.recv_timeout(Duration::from_millis(10)) {
            Ok(MockEvent::Frame(frame)) => {
                self.current = frame;
                Ok(Some(&self.current))
            }
            Ok(MockEvent::ReadError(kind)) => Err(io::Error::from(kind)),
            Ok(MockEvent::Panic) => panic!("capture source fault"),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(Duration::from_millis(10));
                Ok(None)
            }
        }
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn secs_after(t: SystemTime, secs: u64) -> SystemTime {
    t + Duration::from_secs(secs)
}

/// Poll `f` until it's true or two seconds pass.
pub fn wait_for(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    f()
}

/// Tiny deterministic generator for packet sizes.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next_in(&mut self, lo: u64, hi: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        lo + (self.0 >> 33) % (hi - lo + 1)
    }
}
