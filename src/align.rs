/// Rounds an address or byte count up to the machine word alignment.
///
/// Boundary tags are made of machine words, so every chunk header has to
/// start on a word boundary.
///
/// # Examples
///
/// ```rust
/// use rheap::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

/// Converts a byte count into the number of whole units needed to hold it.
///
/// # Examples
///
/// ```rust
/// use rheap::{UNIT, units};
///
/// assert_eq!(units!(0), 0);
/// assert_eq!(units!(1), 1);
/// assert_eq!(units!(UNIT), 1);
/// assert_eq!(units!(UNIT + 1), 2);
/// ```
#[macro_export]
macro_rules! units {
  ($bytes:expr) => {{
    let bytes: usize = $bytes;
    bytes / $crate::UNIT + (bytes % $crate::UNIT != 0) as usize
  }};
}

#[cfg(test)]
mod tests {
  use std::mem;

  use crate::UNIT;

  #[test]
  fn test_align() {
    let ptr_size = mem::size_of::<usize>();

    for i in 0..10 {
      let expected = ptr_size * (i + 1);

      for size in (ptr_size * i + 1)..=(ptr_size * (i + 1)) {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_units() {
    for i in 0..10 {
      for bytes in (UNIT * i + 1)..=(UNIT * (i + 1)) {
        assert_eq!(i + 1, units!(bytes));
      }
    }

    assert_eq!(units!(usize::MAX), usize::MAX / UNIT + 1);
  }
}
