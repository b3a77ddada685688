//! Whole-heap consistency check.
//!
//! Walks every chunk by physical adjacency, then every free list, and
//! reports the first broken invariant. Read-only.

use std::collections::HashSet;

use crate::{
  HeapError,
  chunk::{Bounds, Chunk, Status},
  index::FreeIndex,
};

pub(crate) fn check_heap<I: FreeIndex>(
  bounds: Option<Bounds>,
  index: &I,
) -> Result<(), HeapError> {
  walk(bounds, index).inspect_err(|err| log::error!("heap check failed: {err}"))
}

fn walk<I: FreeIndex>(
  bounds: Option<Bounds>,
  index: &I,
) -> Result<(), HeapError> {
  let Some(bounds) = bounds else {
    return match index.lists().iter().position(|list| !list.is_empty()) {
      Some(list) => Err(HeapError::NotBootstrapped { list }),
      None => Ok(()),
    };
  };

  let mut chunks = HashSet::new();
  let mut free = HashSet::new();
  let mut last_free: Option<Chunk> = None;

  let mut cursor = bounds.first();
  while let Some(chunk) = cursor {
    chunk.check(bounds)?;
    chunks.insert(chunk);

    if chunk.status() == Status::Free {
      if let Some(prev) = last_free {
        return Err(HeapError::Uncoalesced {
          at: prev.addr(),
          next: chunk.addr(),
        });
      }
      free.insert(chunk);
      last_free = Some(chunk);
    } else {
      last_free = None;
    }

    cursor = chunk.physical_next(bounds);
  }

  for (list, free_list) in index.lists().iter().enumerate() {
    let mut prev: Option<Chunk> = None;
    let mut cursor = free_list.head();

    while let Some(chunk) = cursor {
      let at = chunk.addr();
      if !chunks.contains(&chunk) {
        return Err(HeapError::ForeignNode { list, at });
      }
      if chunk.status() != Status::Free {
        return Err(HeapError::ListedNotFree { list, at });
      }
      if !free.remove(&chunk) {
        return Err(HeapError::ListedTwice { at });
      }

      let expected = index.list_for(chunk.span());
      if expected != list {
        return Err(HeapError::WrongList {
          list,
          at,
          span: chunk.span(),
          expected,
        });
      }

      match (prev, chunk.prev_link()) {
        (None, Some(_)) => return Err(HeapError::HeadHasPrev { list, at }),
        (prev, link) if prev != link => return Err(HeapError::BrokenLinks { list, at }),
        _ => {}
      }

      prev = Some(chunk);
      cursor = chunk.next_link();
    }
  }

  match free.iter().min() {
    Some(chunk) => Err(HeapError::Unlisted { at: chunk.addr() }),
    None => Ok(()),
  }
}
