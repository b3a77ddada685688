//! Heap configuration parameters.

/// Configuration for a [`Heap`](crate::Heap).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Smallest payload, in units, requested from the region source on each
  /// growth. Large values amortize the cost of the underlying system call.
  ///
  /// Default: 1024.
  pub min_growth_units: usize,

  /// Run the whole-heap validator around every `allocate` and `release`,
  /// panicking on the first violated invariant.
  ///
  /// Default: on in debug builds, off in release builds.
  pub check_invariants: bool,
}

impl HeapConfig {
  pub const DEFAULT_MIN_GROWTH_UNITS: usize = 1024;

  pub fn new() -> Self {
    Self {
      min_growth_units: Self::DEFAULT_MIN_GROWTH_UNITS,
      check_invariants: cfg!(debug_assertions),
    }
  }

  pub fn with_min_growth_units(
    mut self,
    units: usize,
  ) -> Self {
    self.min_growth_units = units;
    self
  }

  pub fn with_invariant_checks(
    mut self,
    enabled: bool,
  ) -> Self {
    self.check_invariants = enabled;
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = HeapConfig::default();

    assert_eq!(config.min_growth_units, 1024);
    assert_eq!(config.check_invariants, cfg!(debug_assertions));
  }

  #[test]
  fn test_builder() {
    let config = HeapConfig::new()
      .with_min_growth_units(16)
      .with_invariant_checks(true);

    assert_eq!(config.min_growth_units, 16);
    assert!(config.check_invariants);
  }
}
