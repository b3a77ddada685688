//! Boundary-tagged chunks.
//!
//! A chunk is a run of `span` units that starts with a header tag and ends
//! with a footer tag. Both tags are the same three-word record:
//!
//! ```text
//!   ┌──────────────────┬───────────────────────────┬──────────────────┐
//!   │ header           │ payload (span - 2 units)  │ footer           │
//!   │  status          │                           │  (unused)        │
//!   │  span            │                           │  span (mirror)   │
//!   │  link: next_free │                           │  link: prev_free │
//!   └──────────────────┴───────────────────────────┴──────────────────┘
//!   ▲                  ▲
//!   chunk              payload pointer handed out by the heap
//! ```
//!
//! All address arithmetic on the heap lives here. Neighbour queries are
//! checked against the heap [`Bounds`] before anything is treated as a chunk.

use std::{
  fmt, mem,
  ptr::{self, NonNull},
};

use crate::HeapError;

#[repr(C)]
struct Tag {
  status: usize,
  span: usize,
  link: *mut Tag,
}

/// Size of one boundary tag and the allocation granule, in bytes.
pub const UNIT: usize = mem::size_of::<Tag>();

/// Header plus footer.
pub const MIN_SPAN: usize = 2;

const FREE_TAG: usize = 0x4652_4545;
const USED_TAG: usize = 0x5553_4544;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
  Free,
  Used,
}

impl Status {
  fn tag(self) -> usize {
    match self {
      Status::Free => FREE_TAG,
      Status::Used => USED_TAG,
    }
  }

  fn from_tag(raw: usize) -> Option<Self> {
    match raw {
      FREE_TAG => Some(Status::Free),
      USED_TAG => Some(Status::Used),
      _ => None,
    }
  }
}

/// The extended part of a heap, `[lo, hi)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
  lo: *mut u8,
  hi: *mut u8,
}

impl Bounds {
  pub(crate) fn empty_at(base: *mut u8) -> Self {
    Self { lo: base, hi: base }
  }

  pub fn lo(&self) -> *mut u8 {
    self.lo
  }

  pub fn hi(&self) -> *mut u8 {
    self.hi
  }

  pub fn len_units(&self) -> usize {
    (self.hi.addr() - self.lo.addr()) / UNIT
  }

  pub fn is_empty(&self) -> bool {
    self.lo == self.hi
  }

  pub fn contains(
    &self,
    addr: usize,
  ) -> bool {
    self.lo.addr() <= addr && addr < self.hi.addr()
  }

  /// The chunk at `lo`, if anything has been extended yet.
  pub(crate) fn first(&self) -> Option<Chunk> {
    if self.is_empty() {
      return None;
    }
    // SAFETY: bounds are only built by the heap over memory it extended.
    Some(unsafe { Chunk::at(self.lo) })
  }

  pub(crate) fn grow(
    &mut self,
    units: usize,
  ) {
    self.hi = self.hi.wrapping_add(units * UNIT);
  }
}

/// Handle to a chunk header inside a heap.
///
/// Reading through a handle dereferences heap memory, so handles never leave
/// the crate. Callers outside get a [`ChunkInfo`] snapshot instead.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Chunk(NonNull<Tag>);

/// A chunk's tags as read at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
  /// Where the payload starts, one unit past the header.
  pub payload: NonNull<u8>,
  pub status: Status,
  /// Units, header and footer included.
  pub span: usize,
}

impl ChunkInfo {
  pub fn payload_units(&self) -> usize {
    self.span - MIN_SPAN
  }
}

impl Chunk {
  /// # Safety
  ///
  /// `header` must be a non-null, word-aligned pointer to memory that stays
  /// readable and writable for as long as the returned handle is used.
  pub(crate) unsafe fn at(header: *mut u8) -> Self {
    debug_assert_eq!(header.addr() % mem::align_of::<Tag>(), 0);
    Self(unsafe { NonNull::new_unchecked(header.cast()) })
  }

  /// Maps a payload pointer handed out by the heap back to its chunk.
  ///
  /// The pointer is not trusted: it has to land on a unit boundary inside
  /// `bounds`, name a well-formed `USED` chunk, and that chunk must not be
  /// linked into a free list.
  ///
  /// # Safety
  ///
  /// `bounds` must describe the live region of the heap the pointer is
  /// checked against.
  pub(crate) unsafe fn from_payload(
    payload: *mut u8,
    bounds: Bounds,
  ) -> Result<Self, HeapError> {
    let at = payload.addr().wrapping_sub(UNIT);
    if payload.addr() < bounds.lo.addr() + UNIT || !bounds.contains(at) {
      return Err(HeapError::OutOfBounds { at });
    }
    if (at - bounds.lo.addr()) % UNIT != 0 {
      return Err(HeapError::Misaligned { at });
    }

    let chunk = unsafe { Self::at(payload.wrapping_sub(UNIT)) };
    chunk.check(bounds)?;

    if chunk.status() != Status::Used {
      return Err(HeapError::NotInUse { at });
    }
    if chunk.next_link().is_some() || chunk.prev_link().is_some() {
      return Err(HeapError::StaleLinks { at });
    }

    Ok(chunk)
  }

  pub(crate) fn info(self) -> ChunkInfo {
    ChunkInfo {
      payload: self.payload(),
      status: self.status(),
      span: self.span(),
    }
  }

  pub(crate) fn addr(self) -> usize {
    self.0.as_ptr().addr()
  }

  pub(crate) fn as_ptr(self) -> *mut u8 {
    self.0.as_ptr().cast()
  }

  /// First payload byte, one unit past the header.
  pub(crate) fn payload(self) -> NonNull<u8> {
    // SAFETY: span >= 2, so the payload start is inside the chunk.
    unsafe { self.0.cast::<u8>().add(UNIT) }
  }

  fn header(self) -> *mut Tag {
    self.0.as_ptr()
  }

  fn footer(self) -> *mut Tag {
    self
      .as_ptr()
      .wrapping_add((self.span() - 1) * UNIT)
      .cast()
  }

  /// # Panics
  ///
  /// Panics if the header does not carry a known status tag.
  pub(crate) fn status(self) -> Status {
    let raw = self.raw_status();
    match Status::from_tag(raw) {
      Some(status) => status,
      None => panic!("corrupt boundary tag {raw:#x} at {:#x}", self.addr()),
    }
  }

  fn raw_status(self) -> usize {
    unsafe { (*self.header()).status }
  }

  pub(crate) fn set_status(
    self,
    status: Status,
  ) {
    unsafe { (*self.header()).status = status.tag() }
  }

  pub(crate) fn span(self) -> usize {
    let span = self.raw_span();
    debug_assert!(span >= MIN_SPAN, "chunk {:#x}: span {span} is too small", self.addr());
    span
  }

  fn raw_span(self) -> usize {
    unsafe { (*self.header()).span }
  }

  /// Span recorded in the footer.
  pub(crate) fn footer_span(self) -> usize {
    unsafe { (*self.footer()).span }
  }

  pub(crate) fn payload_units(self) -> usize {
    self.span() - MIN_SPAN
  }

  pub(crate) fn next_free(self) -> Option<Chunk> {
    let next = self.next_link();
    debug_assert!(next.is_none_or(|next| next.status() == Status::Free));
    next
  }

  pub(crate) fn prev_free(self) -> Option<Chunk> {
    let prev = self.prev_link();
    debug_assert!(prev.is_none_or(|prev| prev.status() == Status::Free));
    prev
  }

  /// `next_free` without looking at the target.
  pub(crate) fn next_link(self) -> Option<Chunk> {
    NonNull::new(unsafe { (*self.header()).link }).map(Chunk)
  }

  /// `prev_free` without looking at the target.
  pub(crate) fn prev_link(self) -> Option<Chunk> {
    NonNull::new(unsafe { (*self.footer()).link }).map(Chunk)
  }

  pub(crate) fn set_next_free(
    self,
    next: Option<Chunk>,
  ) {
    debug_assert!(next.is_none_or(|next| next.status() == Status::Free));
    unsafe { (*self.header()).link = link_to(next) }
  }

  pub(crate) fn set_prev_free(
    self,
    prev: Option<Chunk>,
  ) {
    debug_assert!(prev.is_none_or(|prev| prev.status() == Status::Free));
    unsafe { (*self.footer()).link = link_to(prev) }
  }

  /// Writes a fresh header and footer with no free-list links.
  pub(crate) fn init(
    self,
    span: usize,
    status: Status,
  ) {
    debug_assert!(span >= MIN_SPAN);
    unsafe {
      self.header().write(Tag {
        status: status.tag(),
        span,
        link: ptr::null_mut(),
      });
      let footer = self.footer();
      (*footer).span = span;
      (*footer).link = ptr::null_mut();
    }
  }

  /// Changes the span and rewrites the footer at its new place. The
  /// `prev_free` link moves along with the footer.
  pub(crate) fn resize(
    self,
    span: usize,
  ) {
    debug_assert!(span >= MIN_SPAN);
    unsafe {
      let prev = (*self.footer()).link;
      (*self.header()).span = span;
      let footer = self.footer();
      (*footer).span = span;
      (*footer).link = prev;
    }
  }

  /// # Safety
  ///
  /// The target must lie inside the same heap region.
  pub(crate) unsafe fn offset(
    self,
    units: usize,
  ) -> Chunk {
    unsafe { Chunk::at(self.as_ptr().wrapping_add(units * UNIT)) }
  }

  /// The chunk that starts right after this one, or `None` at the heap end.
  pub(crate) fn physical_next(
    self,
    bounds: Bounds,
  ) -> Option<Chunk> {
    let span = self.span();
    let next = self.addr().checked_add(span.checked_mul(UNIT)?)?;
    if next >= bounds.hi.addr() {
      return None;
    }
    Some(unsafe { self.offset(span) })
  }

  /// The chunk that ends right before this one, found through its footer,
  /// or `None` at the heap start.
  pub(crate) fn physical_prev(
    self,
    bounds: Bounds,
  ) -> Option<Chunk> {
    let room = self.addr().checked_sub(bounds.lo.addr())?;
    if room < MIN_SPAN * UNIT {
      return None;
    }

    let footer: *mut Tag = self.as_ptr().wrapping_sub(UNIT).cast();
    let span = unsafe { (*footer).span };
    let back = span.checked_mul(UNIT)?;
    if span < MIN_SPAN || back > room {
      return None;
    }

    Some(unsafe { Chunk::at(self.as_ptr().wrapping_sub(back)) })
  }

  /// Checks that this chunk is well formed within `bounds`.
  pub(crate) fn check(
    self,
    bounds: Bounds,
  ) -> Result<(), HeapError> {
    let at = self.addr();
    if !bounds.contains(at) {
      return Err(HeapError::OutOfBounds { at });
    }
    if (at - bounds.lo.addr()) % UNIT != 0 {
      return Err(HeapError::Misaligned { at });
    }

    let span = self.raw_span();
    if span < MIN_SPAN {
      return Err(HeapError::SpanTooSmall { at, span });
    }
    if span > (bounds.hi.addr() - at) / UNIT {
      return Err(HeapError::Overrun { at, span });
    }

    let footer = self.footer_span();
    if footer != span {
      return Err(HeapError::SpanMismatch {
        at,
        header: span,
        footer,
      });
    }

    let raw = self.raw_status();
    if Status::from_tag(raw).is_none() {
      return Err(HeapError::BadStatus { at, raw });
    }

    Ok(())
  }

  /// [`Chunk::check`] that logs the diagnostic instead of returning it.
  pub(crate) fn is_valid(
    self,
    bounds: Bounds,
  ) -> bool {
    self
      .check(bounds)
      .inspect_err(|err| log::error!("{err}"))
      .is_ok()
  }
}

impl fmt::Debug for Chunk {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "Chunk({:#x})", self.addr())
  }
}

fn link_to(chunk: Option<Chunk>) -> *mut Tag {
  chunk.map_or(ptr::null_mut(), |chunk| chunk.0.as_ptr())
}
