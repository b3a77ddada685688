use super::{FreeIndex, FreeList, sealed::Sealed};

pub const NUM_BINS: usize = 10;

/// Bin for a chunk of `span` units: `< 8` goes to bin 0, then one bin per
/// doubling up to `>= 2048` in the last bin.
pub fn bin_index(span: usize) -> usize {
  if span < 8 {
    return 0;
  }
  (span.ilog2() as usize - 2).min(NUM_BINS - 1)
}

/// Free chunks split by size class into [`NUM_BINS`] lists.
#[derive(Debug, Default)]
pub struct SegregatedBins {
  bins: [FreeList; NUM_BINS],
}

impl FreeIndex for SegregatedBins {
  fn lists(&self) -> &[FreeList] {
    &self.bins
  }

  fn list_for(
    &self,
    span: usize,
  ) -> usize {
    bin_index(span)
  }
}

impl Sealed for SegregatedBins {
  fn lists_mut(&mut self) -> &mut [FreeList] {
    &mut self.bins
  }
}
