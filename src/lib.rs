//! # rheap - A Boundary-Tag Heap Library
//!
//! This crate provides an explicit free-list **heap allocator** that manages a
//! linearly growing region of memory, such as the one behind the `sbrk` system
//! call.
//!
//! ## Overview
//!
//! The heap is carved into chunks. Every chunk carries a boundary tag at both
//! ends, so it can be reached from either neighbour:
//!
//! ```text
//!   Heap Region:
//!
//!   heap_lo                                                        heap_hi
//!   ┌────────────────┬──────────┬─────────────────────┬──────────────┐
//!   │  FREE  span 7  │ USED  3  │    USED  span 11    │ FREE  span 5 │
//!   │H             F │H       F │H                  F │H           F│
//!   └────────────────┴──────────┴─────────────────────┴──────────────┘
//!                         ▲
//!                         └── payload = header + 1 unit
//!
//!   H = header  (status, span, next_free)
//!   F = footer  (span,   prev_free)
//! ```
//!
//! Sizes are counted in **units**. One unit is the size of a boundary tag
//! ([`UNIT`]), and a chunk of `span` units has `span - 2` units of payload.
//!
//! Free chunks are kept in doubly-linked lists threaded through their tags.
//! Two strategies are available:
//!
//! ```text
//!   SingleList                      SegregatedBins
//!
//!   head ─► [F] ◄─► [F] ◄─► [F]    bin 0  span <    8 ─► [F] ◄─► [F]
//!                                  bin 1  span <   16 ─► [F]
//!                                  bin 2  span <   32 ─► (empty)
//!                                   ...
//!                                  bin 9  span >= 2048 ─► [F]
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Size macros (align!, units!)
//!   ├── chunk      - Boundary-tag layout and adjacency (Bounds, ChunkInfo)
//!   ├── region     - Region sources and growth (Sbrk, Reserved)
//!   ├── index      - Free-space index (SingleList, SegregatedBins)
//!   ├── engine     - Split and coalesce
//!   ├── heap       - Heap: allocate / release
//!   ├── validate   - Whole-heap validator
//!   ├── config     - HeapConfig
//!   └── error      - HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::{BinnedHeap, Reserved};
//!
//! let mut heap = BinnedHeap::new(Reserved::with_capacity(4096).unwrap());
//!
//! let ptr = heap.allocate(100).unwrap();
//!
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 100);
//!     heap.release(ptr.as_ptr());
//! }
//!
//! assert!(heap.check().is_ok());
//! assert_eq!(heap.stats().free_chunks, 1);
//! ```
//!
//! ## How It Works
//!
//! Allocating searches the free index first fit, then carves the request off
//! the tail of the chunk it found:
//!
//! ```text
//!   Split:
//!
//!   ┌──────────────────────────────────────────┐
//!   │ FREE                               span N │
//!   └──────────────────────────────────────────┘
//!                       │
//!                       ▼
//!   ┌──────────────────────────┬───────────────┐
//!   │ FREE      span N - k - 2 │ USED  k + 2   │
//!   └──────────────────────────┴───────────────┘
//! ```
//!
//! When nothing fits, the heap asks its [`RegionSource`] for more space
//! (at least [`HeapConfig::min_growth_units`]) and merges the new region
//! with a free chunk right before it.
//!
//! Releasing marks the chunk free and merges it with free physical
//! neighbours straight away, so two free chunks never touch:
//!
//! ```text
//!   Coalesce:
//!
//!   ┌────────┬────────────┬────────┐        ┌─────────────────────────────┐
//!   │ FREE a │ released b │ FREE c │   ──►  │ FREE            a + b + c   │
//!   └────────┴────────────┴────────┘        └─────────────────────────────┘
//! ```
//!
//! In debug builds every public operation is bracketed by the whole-heap
//! validator ([`HeapConfig::check_invariants`]).
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`
//! - **No shrinking**: memory taken from the region is never returned
//! - **No in-place resize**
//! - **Unit alignment**: payloads are aligned to the machine word
//! - **Unix-only**: requires `libc` (`sbrk`, `mmap`)
//!
//! ## Safety
//!
//! Releasing takes a raw pointer and is `unsafe`. Pointers the heap can tell
//! are not live allocations (foreign, released twice) make it panic instead
//! of corrupting its metadata; the release profile turns that into an abort.

#[macro_use]
mod align;
mod chunk;
mod config;
mod engine;
mod error;
mod heap;
mod index;
mod region;
mod validate;

pub use chunk::{Bounds, ChunkInfo, MIN_SPAN, Status, UNIT};
pub use config::HeapConfig;
pub use error::HeapError;
pub use heap::{BinnedHeap, Heap, HeapStats, ListHeap};
pub use index::{FreeIndex, FreeList, NUM_BINS, SegregatedBins, SingleList, bin_index};
pub use region::{RegionSource, Reserved, Sbrk};
