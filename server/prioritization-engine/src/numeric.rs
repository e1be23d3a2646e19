//! Decimal rounding shared by effort, criticality and metrics.

/// Round to `places` decimals, ties to even (0.28125 -> 0.2812).
///
/// Rounds the exact binary value rather than `value * 10^places`, so
/// 0.1765 * 1.5 (stored as 0.264749999...) gives 0.2647.
pub fn round_to(value: f64, places: usize) -> f64 {
  if !value.is_finite() {
    return value;
  }
  format!("{:.*}", places, value).parse().unwrap_or(value)
}
