use std::ptr::NonNull;

use rheap::{
  BinnedHeap, FreeIndex, Heap, HeapConfig, HeapError, ListHeap, Reserved, SegregatedBins,
  SingleList, Status, UNIT,
};

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

fn heap<I: FreeIndex>(
  capacity_units: usize,
  min_growth_units: usize,
) -> Heap<I, Reserved> {
  init_logging();
  let config = HeapConfig::new()
    .with_min_growth_units(min_growth_units)
    .with_invariant_checks(true);
  Heap::with_config(Reserved::with_capacity(capacity_units).unwrap(), config)
}

fn reuses_released_chunk<I: FreeIndex>() {
  let mut heap: Heap<I, Reserved> = heap(4096, 1024);

  let _a = heap.allocate(100).unwrap();
  let b = heap.allocate(100).unwrap();
  let _c = heap.allocate(100).unwrap();

  unsafe { heap.release(b.as_ptr()) };
  assert_eq!(heap.stats().free_chunks, 2);

  let again = heap.allocate(100).unwrap();
  assert_eq!(again, b);
  assert_eq!(heap.stats().free_chunks, 1);
}

#[test]
fn test_reuses_released_chunk_list() {
  reuses_released_chunk::<SingleList>();
}

#[test]
fn test_reuses_released_chunk_bins() {
  reuses_released_chunk::<SegregatedBins>();
}

fn coalesces_in_any_order<I: FreeIndex>(order: [usize; 3]) {
  let mut heap: Heap<I, Reserved> = heap(4096, 1024);

  let blocks = [
    heap.allocate(64).unwrap(),
    heap.allocate(128).unwrap(),
    heap.allocate(256).unwrap(),
  ];

  for (released, &at) in order.iter().enumerate() {
    unsafe { heap.release(blocks[at].as_ptr()) };
    assert!(heap.check().is_ok());
    assert_eq!(heap.stats().used_chunks, 2 - released);
  }

  let stats = heap.stats();
  assert_eq!(stats.free_chunks, 1);
  assert_eq!(stats.free_units, stats.heap_units);
  assert_eq!(heap.index().len(), 1);
}

#[test]
fn test_coalesces_in_any_order_list() {
  for order in [[0, 1, 2], [2, 1, 0], [1, 0, 2], [1, 2, 0], [0, 2, 1], [2, 0, 1]] {
    coalesces_in_any_order::<SingleList>(order);
  }
}

#[test]
fn test_coalesces_in_any_order_bins() {
  for order in [[0, 1, 2], [2, 1, 0], [1, 0, 2], [1, 2, 0], [0, 2, 1], [2, 0, 1]] {
    coalesces_in_any_order::<SegregatedBins>(order);
  }
}

#[test]
fn test_payloads_are_aligned_and_disjoint() {
  let mut heap: BinnedHeap<Reserved> = heap(16 * 1024, 1024);

  let sizes = [1, 7, 24, 25, 100, 513, 4000, 3, 48, 9000];
  let mut blocks: Vec<(usize, usize)> = sizes
    .iter()
    .map(|&size| (heap.allocate(size).unwrap().as_ptr().addr(), size))
    .collect();

  blocks.sort();
  for &(addr, _) in &blocks {
    assert_eq!(addr % align_of::<usize>(), 0);
  }
  for pair in blocks.windows(2) {
    let ((lo, size), (hi, _)) = (pair[0], pair[1]);
    assert!(lo + size <= hi);
  }

  let bounds = heap.bounds().unwrap();
  for &(addr, size) in &blocks {
    assert!(bounds.contains(addr));
    assert!(addr + size <= bounds.hi().addr());
  }
}

#[test]
fn test_bins_prefer_small_chunk() {
  let mut heap: BinnedHeap<Reserved> = heap(4096, 1024);

  let _a = heap.allocate(10 * UNIT).unwrap();
  let small = heap.allocate(4 * UNIT).unwrap();
  let _c = heap.allocate(10 * UNIT).unwrap();
  unsafe { heap.release(small.as_ptr()) };

  // Two units fit in the released chunk, which sits in a lower bin than the
  // large free remainder.
  let p = heap.allocate(2 * UNIT).unwrap();
  assert!(p.as_ptr() >= small.as_ptr());
  assert!(p.as_ptr() < small.as_ptr().wrapping_add(4 * UNIT));
}

#[test]
fn test_list_skips_too_small_chunk() {
  let mut heap: ListHeap<Reserved> = heap(4096, 1024);

  let _a = heap.allocate(UNIT).unwrap();
  let small = heap.allocate(UNIT).unwrap();
  let _c = heap.allocate(UNIT).unwrap();
  unsafe { heap.release(small.as_ptr()) };

  // The released chunk heads the list but is too small.
  let head = |heap: &ListHeap<Reserved>| heap.index().lists()[0].chunks().next();
  assert_eq!(head(&heap).map(|chunk| chunk.payload), Some(small));
  assert_eq!(heap.index().find_fit(1).map(|chunk| chunk.payload), Some(small));

  let big = heap.allocate(100 * UNIT).unwrap();
  assert!(big.as_ptr() < small.as_ptr());
  assert_eq!(head(&heap).map(|chunk| chunk.payload), Some(small));
}

#[test]
fn test_growth_and_exhaustion() {
  let mut heap: BinnedHeap<Reserved> = heap(3100, 1024);

  let first = heap.allocate(UNIT).unwrap();
  assert_eq!(heap.stats().heap_units, 1026);

  let big = heap.allocate(2000 * UNIT).unwrap();
  assert_eq!(heap.stats().heap_units, 1026 + 2002);
  assert!(heap.check().is_ok());

  assert!(heap.allocate(2000 * UNIT).is_none());
  assert!(heap.check().is_ok());

  unsafe {
    heap.release(big.as_ptr());
    heap.release(first.as_ptr());
  }

  // Everything merged back, so the large request now fits.
  let stats = heap.stats();
  assert_eq!(stats.free_chunks, 1);
  assert!(heap.allocate(2000 * UNIT).is_some());
}

#[test]
fn test_chunk_walk_matches_allocations() {
  let mut heap: ListHeap<Reserved> = heap(4096, 128);

  let blocks: Vec<NonNull<u8>> = (1..=4).map(|n| heap.allocate(n * UNIT).unwrap()).collect();

  let used: Vec<_> = heap
    .chunks()
    .filter(|chunk| chunk.status == Status::Used)
    .map(|chunk| (chunk.payload, chunk.payload_units()))
    .collect();

  let mut expected: Vec<_> = blocks.iter().copied().zip(1..=4).collect();
  expected.reverse();
  assert_eq!(used, expected);
}

#[test]
fn test_reserve_rejects_empty_capacity() {
  let err = match Reserved::with_capacity(0) {
    Err(err) => err,
    Ok(_) => panic!("an empty reservation succeeded"),
  };

  assert!(matches!(err, HeapError::Reserve { bytes: 0, .. }));
  assert_eq!(err.to_string(), "failed to reserve 0 bytes");
}

#[test]
#[should_panic(expected = "invalid release")]
fn test_release_inside_payload_panics() {
  let mut heap: ListHeap<Reserved> = heap(4096, 1024);

  let p = heap.allocate(10 * UNIT).unwrap();
  unsafe { heap.release(p.as_ptr().add(2 * UNIT)) };
}

#[test]
fn test_chunk_snapshots_outlive_heap() {
  let (first, last) = {
    let mut heap: BinnedHeap<Reserved> = heap(4096, 1024);
    heap.allocate(64).unwrap();
    let chunks: Vec<_> = heap.chunks().collect();
    (chunks[0], chunks[1])
  };

  assert_eq!(first.status, Status::Free);
  assert_eq!(first.span, 1026 - 5);
  assert_eq!(first.payload_units(), 1026 - 7);
  assert_eq!(last.status, Status::Used);
  assert_eq!(last.span, 5);
  assert_eq!(last.payload_units(), 3);
}

#[test]
fn test_config_is_kept() {
  let config = HeapConfig::new()
    .with_min_growth_units(32)
    .with_invariant_checks(false);
  let region = Reserved::with_capacity(256).unwrap();
  let mut heap: ListHeap<Reserved> = Heap::with_config(region, config);

  assert_eq!(heap.config().min_growth_units, 32);
  assert!(!heap.config().check_invariants);

  heap.allocate(1).unwrap();
  assert_eq!(heap.stats().heap_units, 34);
  assert_eq!(heap.source().capacity_units(), 256);
  assert_eq!(heap.source().remaining_units(), 256 - 34);
}
