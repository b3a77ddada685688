//! Heap diagnostics.
//!
//! Every variant names the chunk (by header address) or the free list where
//! the problem was found. Validator failures and misuse in
//! [`Heap::release`](crate::Heap::release) are reported through this type.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeapError {
  #[error("chunk {at:#x} lies outside the heap")]
  OutOfBounds { at: usize },

  #[error("chunk {at:#x} is not on a unit boundary")]
  Misaligned { at: usize },

  #[error("chunk {at:#x}: span {span} is too small")]
  SpanTooSmall { at: usize, span: usize },

  #[error("chunk {at:#x}: span {span} runs past the end of the heap")]
  Overrun { at: usize, span: usize },

  #[error("chunk {at:#x}: header span {header} does not match footer span {footer}")]
  SpanMismatch {
    at: usize,
    header: usize,
    footer: usize,
  },

  #[error("chunk {at:#x}: unknown status tag {raw:#x}")]
  BadStatus { at: usize, raw: usize },

  #[error("free chunks {at:#x} and {next:#x} are adjacent but were not coalesced")]
  Uncoalesced { at: usize, next: usize },

  #[error("list {list}: {at:#x} is not a chunk of this heap")]
  ForeignNode { list: usize, at: usize },

  #[error("list {list}: chunk {at:#x} is listed but not free")]
  ListedNotFree { list: usize, at: usize },

  #[error("list {list}: head {at:#x} has a predecessor")]
  HeadHasPrev { list: usize, at: usize },

  #[error("list {list}: links around chunk {at:#x} are not symmetric")]
  BrokenLinks { list: usize, at: usize },

  #[error("list {list}: chunk {at:#x} of span {span} belongs in list {expected}")]
  WrongList {
    list: usize,
    at: usize,
    span: usize,
    expected: usize,
  },

  #[error("chunk {at:#x} is reachable from the free index more than once")]
  ListedTwice { at: usize },

  #[error("free chunk {at:#x} is missing from the free index")]
  Unlisted { at: usize },

  #[error("list {list} is not empty but the heap was never bootstrapped")]
  NotBootstrapped { list: usize },

  #[error("chunk {at:#x} is not in use")]
  NotInUse { at: usize },

  #[error("chunk {at:#x} still carries free-list links")]
  StaleLinks { at: usize },

  #[error("failed to reserve {bytes} bytes")]
  Reserve {
    bytes: usize,
    #[source]
    source: io::Error,
  },
}
