//! Tests against the real program break. They hold `BREAK` so no two of them
//! move the break at the same time.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rheap::{BinnedHeap, HeapConfig, Sbrk, UNIT};

static BREAK: Mutex<()> = Mutex::new(());

fn lock_break() -> MutexGuard<'static, ()> {
  let _ = env_logger::builder().is_test(true).try_init();
  BREAK.lock().unwrap_or_else(PoisonError::into_inner)
}

#[test]
fn test_sbrk_heap() {
  let _break = lock_break();

  let config = HeapConfig::new().with_invariant_checks(true);
  let mut heap = BinnedHeap::with_config(Sbrk::new(), config);

  let before = Sbrk::program_break();
  let a = heap.allocate(100).unwrap();
  let b = heap.allocate(10 * UNIT).unwrap();

  let bounds = heap.bounds().unwrap();
  assert!(bounds.lo().addr() >= before.addr());
  assert!(Sbrk::program_break().addr() >= bounds.hi().addr());
  assert_eq!(heap.stats().heap_units, HeapConfig::DEFAULT_MIN_GROWTH_UNITS + 2);

  unsafe {
    a.as_ptr().write_bytes(0x5A, 100);
    b.as_ptr().write_bytes(0xA5, 10 * UNIT);

    heap.release(a.as_ptr());
    heap.release(b.as_ptr());
  }

  assert!(heap.check().is_ok());
  assert_eq!(heap.stats().free_chunks, 1);
}

#[test]
fn test_moved_break_stops_growth() {
  let _break = lock_break();

  let config = HeapConfig::new()
    .with_min_growth_units(16)
    .with_invariant_checks(true);
  let mut heap = BinnedHeap::with_config(Sbrk::new(), config);

  let first = heap.allocate(UNIT).unwrap();
  let before = heap.stats();
  assert_eq!(before.heap_units, 18);

  // Someone else takes the next page of the break.
  let taken = unsafe { libc::sbrk(4096) };
  assert_ne!(taken, usize::MAX as *mut libc::c_void);
  let moved = Sbrk::program_break();

  assert!(heap.allocate(100 * UNIT).is_none());
  assert!(heap.check().is_ok());
  assert_eq!(heap.stats(), before);
  assert_eq!(Sbrk::program_break(), moved);

  unsafe {
    heap.release(first.as_ptr());
    libc::sbrk(-4096);
  }
  assert!(heap.check().is_ok());
  assert_eq!(heap.stats().free_chunks, 1);
}
