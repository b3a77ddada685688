use std::{
  io,
  ptr::{self, NonNull},
};

use libc::{c_void, intptr_t, sbrk};

use crate::{
  HeapError,
  chunk::{Bounds, Chunk, MIN_SPAN, Status, UNIT},
};

/// A linearly growable stretch of address space the heap lives in.
///
/// # Safety
///
/// Every region returned by [`RegionSource::extend_region`] must be readable,
/// writable, word-aligned, start exactly where the previous one ended (the
/// first one at [`RegionSource::base`]), and stay mapped for as long as the
/// source is alive. A failed call must leave the source unchanged.
pub unsafe trait RegionSource {
  /// Where the heap starts. Called once, when the heap bootstraps.
  fn base(&mut self) -> Option<NonNull<u8>>;

  /// Appends `units` units to the region and returns the start of the new
  /// part, or `None` when the environment is exhausted.
  fn extend_region(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>>;
}

/// The process program break, moved with `sbrk(2)`.
///
/// Memory taken from the break is never handed back.
pub struct Sbrk {
  end: *mut u8,
}

impl Sbrk {
  pub const fn new() -> Self {
    Self { end: ptr::null_mut() }
  }

  /// Current program break (`sbrk(0)`).
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) }.cast()
  }
}

impl Default for Sbrk {
  fn default() -> Self {
    Self::new()
  }
}

fn sbrk_failed(address: *mut c_void) -> bool {
  address == usize::MAX as *mut c_void
}

unsafe impl RegionSource for Sbrk {
  fn base(&mut self) -> Option<NonNull<u8>> {
    unsafe {
      let current = sbrk(0);
      if sbrk_failed(current) {
        log::error!("sbrk(0) failed");
        return None;
      }

      let padding = align!(current as usize) - current as usize;
      if padding != 0 && sbrk_failed(sbrk(padding as intptr_t)) {
        log::error!("cannot align the program break at {current:?}");
        return None;
      }

      self.end = current.cast::<u8>().wrapping_add(padding);
      log::debug!("heap bootstrapped at program break {:?}", self.end);
      NonNull::new(self.end)
    }
  }

  fn extend_region(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>> {
    let bytes = units
      .checked_mul(UNIT)
      .filter(|&bytes| bytes <= isize::MAX as usize)?;

    unsafe {
      let address = sbrk(bytes as intptr_t);
      if sbrk_failed(address) {
        log::debug!("sbrk({bytes}) failed");
        return None;
      }

      let base = address.cast::<u8>();
      if base != self.end {
        log::warn!(
          "program break moved from {:?} to {:?} behind the heap's back",
          self.end,
          base
        );
        if sbrk(0).cast::<u8>() == base.wrapping_add(bytes) {
          sbrk(-(bytes as intptr_t));
        }
        return None;
      }

      self.end = base.wrapping_add(bytes);
      NonNull::new(base)
    }
  }
}

/// A fixed-capacity anonymous mapping with a break of its own.
///
/// Gives independent heaps that do not touch the process program break, and
/// a hard limit that makes exhaustion reproducible.
pub struct Reserved {
  start: NonNull<u8>,
  capacity: usize,
  used: usize,
}

impl Reserved {
  pub fn with_capacity(units: usize) -> Result<Self, HeapError> {
    let Some(bytes) = units.checked_mul(UNIT).filter(|&bytes| bytes > 0) else {
      return Err(HeapError::Reserve {
        bytes: units.saturating_mul(UNIT),
        source: io::Error::from(io::ErrorKind::InvalidInput),
      });
    };

    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        bytes,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
        -1,
        0,
      )
    };
    if address == libc::MAP_FAILED {
      return Err(HeapError::Reserve {
        bytes,
        source: io::Error::last_os_error(),
      });
    }

    let start = NonNull::new(address.cast()).ok_or_else(|| HeapError::Reserve {
      bytes,
      source: io::Error::from(io::ErrorKind::AddrNotAvailable),
    })?;

    Ok(Self {
      start,
      capacity: bytes,
      used: 0,
    })
  }

  pub fn capacity_units(&self) -> usize {
    self.capacity / UNIT
  }

  pub fn remaining_units(&self) -> usize {
    (self.capacity - self.used) / UNIT
  }
}

impl Drop for Reserved {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.start.as_ptr().cast(), self.capacity);
    }
  }
}

unsafe impl RegionSource for Reserved {
  fn base(&mut self) -> Option<NonNull<u8>> {
    Some(unsafe { self.start.add(self.used) })
  }

  fn extend_region(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>> {
    let bytes = units.checked_mul(UNIT)?;
    if bytes > self.capacity - self.used {
      return None;
    }

    let base = unsafe { self.start.add(self.used) };
    self.used += bytes;
    Some(base)
  }
}

/// Extends the heap by at least `need_units` of payload.
///
/// The new region becomes one `FREE` chunk that is not linked into any free
/// index yet. Returns `None`, with `bounds` untouched, when the source is
/// exhausted.
pub(crate) fn grow<R: RegionSource>(
  source: &mut R,
  bounds: &mut Bounds,
  need_units: usize,
  min_growth_units: usize,
) -> Option<Chunk> {
  let grow_units = need_units.max(min_growth_units).checked_add(MIN_SPAN)?;

  let Some(base) = source.extend_region(grow_units) else {
    log::debug!("region exhausted growing by {grow_units} units");
    return None;
  };
  assert_eq!(
    base.as_ptr(),
    bounds.hi(),
    "region source returned a non-contiguous region"
  );

  bounds.grow(grow_units);
  let chunk = unsafe { Chunk::at(base.as_ptr()) };
  chunk.init(grow_units, Status::Free);

  log::debug!(
    "heap grew by {grow_units} units to {} units",
    bounds.len_units()
  );
  Some(chunk)
}
