//! Collection of utility functions shared by the Bandwatch crates.

#![warn(missing_docs)]

mod hardware_address;

/// Human-readable rates for log output
pub mod packet_scale;

/// Direction-explicit counter pairs.
pub mod units;

/// Utilities dealing with Unix Timestamps
pub mod unix_time;

/// Link-layer (MAC) address
pub use hardware_address::{HardwareAddress, HardwareAddressError};
