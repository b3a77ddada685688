use std::slice;

use super::{FreeIndex, FreeList, sealed::Sealed};

/// Every free chunk on one list. Search is a linear first fit from the head.
#[derive(Debug, Default)]
pub struct SingleList {
  list: FreeList,
}

impl FreeIndex for SingleList {
  fn lists(&self) -> &[FreeList] {
    slice::from_ref(&self.list)
  }

  fn list_for(
    &self,
    _span: usize,
  ) -> usize {
    0
  }
}

impl Sealed for SingleList {
  fn lists_mut(&mut self) -> &mut [FreeList] {
    slice::from_mut(&mut self.list)
  }
}
