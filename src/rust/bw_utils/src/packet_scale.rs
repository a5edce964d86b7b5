/// Format a bits-per-second figure for humans.
pub fn scale_bits(n: u64) -> String {
  if n > 1_000_000_000 {
    format!("{:.2} gbit/s", n as f32 / 1_000_000_000.0)
  } else if n > 1_000_000 {
    format!("{:.2} mbit/s", n as f32 / 1_000_000.0)
  } else if n > 1_000 {
    format!("{:.2} kbit/s", n as f32 / 1_000.0)
  } else {
    format!("{n} bit/s")
  }
}

/// Format a rate already expressed in megabits per second.
/// Negative and non-finite inputs are shown as zero.
pub fn scale_mbps(mbps: f64) -> String {
  if !mbps.is_finite() || mbps <= 0.0 {
    return scale_bits(0);
  }
  scale_bits((mbps * 1_000_000.0).round() as u64)
}
