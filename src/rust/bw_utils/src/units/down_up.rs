//! A counter pair with the direction spelled out, relative to a monitored
//! endpoint:
//!
//! * `down` is traffic *towards* the endpoint (it was the packet's destination).
//! * `up` is traffic *from* the endpoint (it was the packet's source).

use num_traits::{SaturatingAdd, Zero};
use serde::{Deserialize, Serialize};

/// Download and upload values kept side by side, so the two directions
/// can't be swapped by accident.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default, Hash)]
pub struct DownUpOrder<T> {
    /// Towards the endpoint
    pub down: T,
    /// From the endpoint
    pub up: T,
}

impl<T> DownUpOrder<T>
where
    T: Zero + SaturatingAdd + Copy,
{
    /// A pair with explicit values.
    pub fn new(down: T, up: T) -> Self {
        Self { down, up }
    }

    /// Both directions zero.
    pub fn zeroed() -> Self {
        Self::new(T::zero(), T::zero())
    }

    /// Add to each direction. Overflow sticks at `T`'s maximum.
    pub fn checked_add_direct(&mut self, down: T, up: T) {
        self.down = self.down.saturating_add(&down);
        self.up = self.up.saturating_add(&up);
    }

    /// Zero both directions.
    pub fn set_to_zero(&mut self) {
        *self = Self::zeroed();
    }

    /// Return the current values and zero them in one step.
    pub fn take(&mut self) -> DownUpOrder<T> {
        std::mem::replace(self, Self::zeroed())
    }

    /// True if either direction is non-zero.
    pub fn not_zero(&self) -> bool {
        !self.down.is_zero() || !self.up.is_zero()
    }
}
