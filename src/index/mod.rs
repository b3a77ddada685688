//! Free-space indexing.
//!
//! Free chunks are threaded into intrusive doubly-linked lists: `next_free`
//! lives in the header, `prev_free` in the footer. A strategy decides how
//! many lists there are and which list a chunk of a given span belongs to;
//! insertion with coalescing, removal and first-fit search are shared.
//!
//! Only the heap links and unlinks chunks. From outside the crate an index
//! can be inspected but not changed:
//!
//! ```compile_fail
//! use rheap::{BinnedHeap, FreeIndex, Reserved, SingleList};
//!
//! let mut heap = BinnedHeap::new(Reserved::with_capacity(4096).unwrap());
//! let _ = heap.allocate(64);
//!
//! let mut list = SingleList::default();
//! let bounds = heap.bounds().unwrap();
//! for chunk in heap.chunks() {
//!     list.insert(bounds, chunk);
//! }
//! ```
//!
//! ```compile_fail
//! use rheap::{FreeIndex, SingleList};
//!
//! let mut list = SingleList::default();
//! let _ = list.lists_mut();
//! ```

mod bins;
mod list;

use std::iter;

pub use bins::{NUM_BINS, SegregatedBins, bin_index};
pub use list::SingleList;

use crate::{
  chunk::{Bounds, Chunk, ChunkInfo, MIN_SPAN, Status},
  engine,
};

/// One list of free chunks. The head never has a predecessor.
#[derive(Debug, Default)]
pub struct FreeList {
  head: Option<Chunk>,
}

impl FreeList {
  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  pub fn len(&self) -> usize {
    self.iter().count()
  }

  /// The listed chunks, head first.
  pub fn chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
    self.iter().map(Chunk::info)
  }

  pub(crate) fn head(&self) -> Option<Chunk> {
    self.head
  }

  pub(crate) fn iter(&self) -> impl Iterator<Item = Chunk> + '_ {
    iter::successors(self.head, |chunk| chunk.next_free())
  }

  /// First chunk, from the head, with room for `need_units` of payload.
  pub(crate) fn first_fit(
    &self,
    need_units: usize,
  ) -> Option<Chunk> {
    self.iter().find(|chunk| chunk.payload_units() >= need_units)
  }

  pub(crate) fn push_front(
    &mut self,
    chunk: Chunk,
  ) {
    chunk.set_prev_free(None);
    chunk.set_next_free(self.head);
    if let Some(head) = self.head {
      head.set_prev_free(Some(chunk));
    }
    self.head = Some(chunk);
  }

  /// Unlinks `chunk` without touching its status. Returns `false` if the
  /// chunk was not in this list.
  pub(crate) fn unlink(
    &mut self,
    chunk: Chunk,
  ) -> bool {
    let prev = chunk.prev_free();
    let next = chunk.next_free();

    match prev {
      Some(prev) => prev.set_next_free(next),
      None if self.head == Some(chunk) => self.head = next,
      None => return false,
    }
    if let Some(next) = next {
      next.set_prev_free(prev);
    }

    chunk.set_next_free(None);
    chunk.set_prev_free(None);
    true
  }
}

mod sealed {
  use super::FreeList;

  pub trait Sealed {
    fn lists_mut(&mut self) -> &mut [FreeList];
  }
}

/// A way of organising free chunks into [`FreeList`]s.
///
/// Implemented by [`SingleList`] and [`SegregatedBins`] only. A chunk of
/// span `s` is always in list `list_for(s)`, so its span must not change
/// while it is linked.
pub trait FreeIndex: Default + sealed::Sealed {
  fn lists(&self) -> &[FreeList];

  fn list_for(
    &self,
    span: usize,
  ) -> usize;

  fn is_empty(&self) -> bool {
    self.lists().iter().all(FreeList::is_empty)
  }

  fn len(&self) -> usize {
    self.lists().iter().map(FreeList::len).sum()
  }

  /// First fit for `need_units` of payload. Lists below the one the
  /// allocated span would be filed in are never searched.
  fn find_fit(
    &self,
    need_units: usize,
  ) -> Option<ChunkInfo> {
    fit(self, need_units).map(Chunk::info)
  }
}

fn fit<I: FreeIndex + ?Sized>(
  index: &I,
  need_units: usize,
) -> Option<Chunk> {
  let start = index.list_for(need_units.saturating_add(MIN_SPAN));
  index.lists()[start..]
    .iter()
    .find_map(|list| list.first_fit(need_units))
}

/// The mutating half of a [`FreeIndex`], for the heap and the engine.
pub(crate) trait IndexOps: FreeIndex {
  fn fit(
    &self,
    need_units: usize,
  ) -> Option<Chunk> {
    fit(self, need_units)
  }

  /// Marks `chunk` free and files it, merging it with free physical
  /// neighbours first: the successor, then the predecessor. Returns the
  /// chunk that ends up in the index.
  fn insert(
    &mut self,
    bounds: Bounds,
    chunk: Chunk,
  ) -> Chunk {
    chunk.set_status(Status::Free);
    chunk.set_next_free(None);
    chunk.set_prev_free(None);

    let mut survivor = chunk;
    if let Some(next) = survivor.physical_next(bounds) {
      if next.status() == Status::Free {
        survivor = engine::coalesce_two(self, bounds, survivor, next);
      }
    }
    if let Some(prev) = survivor.physical_prev(bounds) {
      if prev.status() == Status::Free {
        survivor = engine::coalesce_two(self, bounds, prev, survivor);
      }
    }

    self.push(survivor);
    survivor
  }

  /// Takes a linked chunk out of the index and marks it used.
  fn detach(
    &mut self,
    chunk: Chunk,
  ) {
    let linked = self.unlink(chunk);
    debug_assert!(linked, "{chunk:?} is not in the free index");
    chunk.set_status(Status::Used);
  }

  /// Links a free chunk at the head of its list.
  fn push(
    &mut self,
    chunk: Chunk,
  ) {
    let list = self.list_for(chunk.span());
    self.lists_mut()[list].push_front(chunk);
  }

  /// Unlinks a chunk without changing its status. Returns `false` if it was
  /// not linked.
  fn unlink(
    &mut self,
    chunk: Chunk,
  ) -> bool {
    let list = self.list_for(chunk.span());
    self.lists_mut()[list].unlink(chunk)
  }
}

impl<I: FreeIndex> IndexOps for I {}
