//! Block surgery: carving a used chunk out of a free one, and merging two
//! free neighbours.

use crate::{
  chunk::{Bounds, Chunk, MIN_SPAN, Status},
  index::IndexOps,
};

/// Carves a `USED` chunk with `need_units` of payload off the tail of the
/// free, linked `chunk`.
///
/// The leading remainder stays free and keeps its links. It only moves to
/// another list if its new span is filed elsewhere.
pub(crate) fn split_for_alloc<I: IndexOps>(
  index: &mut I,
  bounds: Bounds,
  chunk: Chunk,
  need_units: usize,
) -> Chunk {
  let old_span = chunk.span();
  let alloc_span = MIN_SPAN + need_units;
  debug_assert_eq!(chunk.status(), Status::Free);
  debug_assert!(old_span >= alloc_span + MIN_SPAN, "remainder would be too small");

  let remain_span = old_span - alloc_span;
  let refile = index.list_for(remain_span) != index.list_for(old_span);
  if refile {
    index.unlink(chunk);
  }

  chunk.resize(remain_span);
  let alloc = unsafe { chunk.offset(remain_span) };
  alloc.init(alloc_span, Status::Used);

  if refile {
    index.push(chunk);
  }

  debug_assert!(chunk.is_valid(bounds) && alloc.is_valid(bounds));
  debug_assert_eq!(chunk.physical_next(bounds), Some(alloc));
  alloc
}

/// Merges `b` into `a`, its free physical predecessor.
///
/// Both are taken out of the index first; the merged chunk is returned
/// unlinked and `b` stops existing.
pub(crate) fn coalesce_two<I: IndexOps>(
  index: &mut I,
  bounds: Bounds,
  a: Chunk,
  b: Chunk,
) -> Chunk {
  debug_assert_eq!(a.status(), Status::Free);
  debug_assert_eq!(b.status(), Status::Free);
  debug_assert_eq!(a.physical_next(bounds), Some(b));
  debug_assert_eq!(b.physical_prev(bounds), Some(a));

  index.unlink(a);
  index.unlink(b);
  a.resize(a.span() + b.span());
  debug_assert!(a.is_valid(bounds));
  a
}
