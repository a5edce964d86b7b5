use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 48-bit link-layer (Ethernet) address.
///
/// Formatted as lower-case, colon separated octets (`aa:bb:cc:dd:ee:ff`).
/// Parsing also accepts `-` separators and upper-case hex.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HardwareAddress(pub [u8; 6]);

impl HardwareAddress {
  /// Build from raw octets.
  pub const fn new(octets: [u8; 6]) -> Self {
    Self(octets)
  }

  /// The raw octets.
  pub fn octets(&self) -> [u8; 6] {
    self.0
  }

  /// `ff:ff:ff:ff:ff:ff`
  pub fn is_broadcast(&self) -> bool {
    self.0 == [0xff; 6]
  }

  /// Group bit set (includes broadcast).
  pub fn is_multicast(&self) -> bool {
    self.0[0] & 0x01 == 0x01
  }

  /// All zeroes, typically a placeholder.
  pub fn is_zero(&self) -> bool {
    self.0 == [0; 6]
  }
}

impl fmt::Display for HardwareAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let o = self.0;
    write!(
      f,
      "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
      o[0], o[1], o[2], o[3], o[4], o[5]
    )
  }
}

impl fmt::Debug for HardwareAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "HardwareAddress({self})")
  }
}

/// Things that can go wrong parsing a hardware address.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HardwareAddressError {
  /// Wrong number of octets
  #[error("Expected 6 octets, found {0}")]
  WrongLength(usize),
  /// An octet wasn't two hex digits
  #[error("Invalid octet: {0}")]
  BadOctet(String),
}

impl FromStr for HardwareAddress {
  type Err = HardwareAddressError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.trim().split([':', '-']).collect();
    if parts.len() != 6 {
      return Err(HardwareAddressError::WrongLength(parts.len()));
    }
    let mut octets = [0u8; 6];
    for (octet, part) in octets.iter_mut().zip(parts) {
      if part.len() != 2 {
        return Err(HardwareAddressError::BadOctet(part.to_string()));
      }
      *octet = u8::from_str_radix(part, 16)
        .map_err(|_| HardwareAddressError::BadOctet(part.to_string()))?;
    }
    Ok(Self(octets))
  }
}

impl Serialize for HardwareAddress {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for HardwareAddress {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_and_display() {
    let mac: HardwareAddress = "AA-bb-CC-01-02-03".parse().unwrap();
    assert_eq!(mac.octets(), [0xaa, 0xbb, 0xcc, 0x01, 0x02, 0x03]);
    assert_eq!(mac.to_string(), "aa:bb:cc:01:02:03");
  }

  #[test]
  fn parse_failures() {
    assert_eq!(
      "aa:bb".parse::<HardwareAddress>(),
      Err(HardwareAddressError::WrongLength(2))
    );
    assert!("aa:bb:cc:dd:ee:gg".parse::<HardwareAddress>().is_err());
    assert!("aaa:bb:cc:dd:ee:ff".parse::<HardwareAddress>().is_err());
  }

  #[test]
  fn classification() {
    assert!(HardwareAddress::new([0xff; 6]).is_broadcast());
    assert!(HardwareAddress::new([0x01, 0, 0x5e, 0, 0, 1]).is_multicast());
    assert!(!HardwareAddress::new([0x02, 0, 0, 0, 0, 1]).is_multicast());
    assert!(HardwareAddress::default().is_zero());
  }
}
