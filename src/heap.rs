use std::{iter, ptr::NonNull};

use crate::{
  HeapConfig, HeapError,
  chunk::{Bounds, Chunk, ChunkInfo, MIN_SPAN, Status},
  engine,
  index::{FreeIndex, IndexOps, SegregatedBins, SingleList},
  region::{self, RegionSource, Sbrk},
  validate,
};

/// A boundary-tag heap over a linearly growing region.
///
/// The heap owns everything it manages: bounds, free index and region
/// source. It is not `Send` or `Sync`; a host that shares one heap between
/// threads has to serialize every call itself.
pub struct Heap<I = SegregatedBins, R = Sbrk> {
  index: I,
  source: R,
  bounds: Option<Bounds>,
  config: HeapConfig,
}

/// Heap with one address-adjacency-aware free list.
pub type ListHeap<R> = Heap<SingleList, R>;

/// Heap with size-segregated free lists.
pub type BinnedHeap<R> = Heap<SegregatedBins, R>;

/// Usage summary from a physical walk of the heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub heap_units: usize,
  pub used_chunks: usize,
  pub used_units: usize,
  pub free_chunks: usize,
  pub free_units: usize,
}

impl<I: FreeIndex, R: RegionSource> Heap<I, R> {
  pub fn new(source: R) -> Self {
    Self::with_config(source, HeapConfig::default())
  }

  pub fn with_config(
    source: R,
    config: HeapConfig,
  ) -> Self {
    Self {
      index: I::default(),
      source,
      bounds: None,
      config,
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn index(&self) -> &I {
    &self.index
  }

  pub fn source(&self) -> &R {
    &self.source
  }

  /// `None` until the first allocation bootstraps the heap.
  pub fn bounds(&self) -> Option<Bounds> {
    self.bounds
  }

  fn bootstrap(&mut self) -> Option<Bounds> {
    if self.bounds.is_none() {
      let base = self.source.base()?;
      self.bounds = Some(Bounds::empty_at(base.as_ptr()));
    }
    self.bounds
  }

  /// Allocates at least `size` bytes.
  ///
  /// Returns `None` for a zero-sized request and when the region source is
  /// exhausted; in both cases the heap is left as it was.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }

    let Some(mut bounds) = self.bootstrap() else {
      log::error!("allocate({size}): cannot bootstrap the heap");
      return None;
    };
    self.debug_check();

    let need_units = units!(size);
    let chunk = match self.index.fit(need_units) {
      Some(chunk) => chunk,
      None => {
        let grown = region::grow(
          &mut self.source,
          &mut bounds,
          need_units,
          self.config.min_growth_units,
        );
        let Some(grown) = grown else {
          log::debug!("allocate({size}): out of memory");
          self.debug_check();
          return None;
        };
        self.bounds = Some(bounds);
        self.index.insert(bounds, grown)
      }
    };

    let used = self.carve(bounds, chunk, need_units);
    log::trace!("allocate({size}) -> {used:?}, span {}", used.span());

    self.debug_check();
    Some(used.payload())
  }

  /// Turns a linked free chunk into a used one with `need_units` of payload,
  /// splitting off the tail when the rest is big enough to stand alone.
  fn carve(
    &mut self,
    bounds: Bounds,
    chunk: Chunk,
    need_units: usize,
  ) -> Chunk {
    if chunk.payload_units() >= need_units + MIN_SPAN {
      engine::split_for_alloc(&mut self.index, bounds, chunk, need_units)
    } else {
      self.index.detach(chunk);
      chunk
    }
  }

  /// Gives an allocation back. A null pointer is ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by [`Heap::allocate`] on this
  /// heap that has not been released yet.
  ///
  /// # Panics
  ///
  /// Panics when the pointer is recognisably not a live allocation of this
  /// heap: outside the heap, released twice, or on a corrupted chunk.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    let Some(bounds) = self.bounds else {
      panic!("invalid release of {ptr:?}: the heap has never allocated");
    };
    self.debug_check();

    let chunk = match unsafe { Chunk::from_payload(ptr, bounds) } {
      Ok(chunk) => chunk,
      Err(err) => panic!("invalid release of {ptr:?}: {err}"),
    };

    let merged = self.index.insert(bounds, chunk);
    log::trace!("release({ptr:?}) -> {merged:?}, span {}", merged.span());

    self.debug_check();
  }

  /// Runs the whole-heap validator.
  pub fn check(&self) -> Result<(), HeapError> {
    validate::check_heap(self.bounds, &self.index)
  }

  fn debug_check(&self) {
    if !self.config.check_invariants {
      return;
    }
    if let Err(err) = self.check() {
      panic!("heap invariant violated: {err}");
    }
  }

  /// Every chunk, in address order, as read while walking.
  pub fn chunks(&self) -> impl Iterator<Item = ChunkInfo> + '_ {
    self.walk().map(Chunk::info)
  }

  fn walk(&self) -> impl Iterator<Item = Chunk> + '_ {
    let bounds = self.bounds;
    let first = bounds.and_then(|bounds| bounds.first());
    iter::successors(first, move |chunk| {
      bounds.and_then(|bounds| chunk.physical_next(bounds))
    })
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      heap_units: self.bounds.map_or(0, |bounds| bounds.len_units()),
      ..HeapStats::default()
    };

    for chunk in self.chunks() {
      match chunk.status {
        Status::Free => {
          stats.free_chunks += 1;
          stats.free_units += chunk.span;
        }
        Status::Used => {
          stats.used_chunks += 1;
          stats.used_units += chunk.span;
        }
      }
    }

    stats
  }
}

impl<I: FreeIndex, R: RegionSource + Default> Default for Heap<I, R> {
  fn default() -> Self {
    Self::new(R::default())
  }
}
