use std::{io::Read, ptr};

use rheap::{BinnedHeap, Sbrk, Status};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    Sbrk::program_break(),
  );
}

/// Prints every chunk of the heap in address order.
fn print_chunks(heap: &BinnedHeap<Sbrk>) {
  for chunk in heap.chunks() {
    let status = match chunk.status {
      Status::Free => "FREE",
      Status::Used => "USED",
    };
    println!("    payload {:?} {} span {}", chunk.payload, status, chunk.span);
  }

  let stats = heap.stats();
  println!(
    "    heap: {} units, {} used ({} units), {} free ({} units)",
    stats.heap_units, stats.used_chunks, stats.used_units, stats.free_chunks, stats.free_units,
  );
}

fn main() {
  env_logger::init();

  // Boundary-tag heap on top of the program break, with size-segregated
  // free lists.
  let mut heap = BinnedHeap::new(Sbrk::new());

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate a u32. The first request grows the heap by a large
  //    chunk and carves the allocation off its tail.
  // --------------------------------------------------------------------
  let Some(first_block) = heap.allocate(size_of::<u32>()) else {
    eprintln!("the program break could not be moved");
    return;
  };
  println!("\n[1] Allocate u32 at {:?}", first_block);
  print_chunks(&heap);

  let first_ptr = first_block.as_ptr() as *mut u32;
  unsafe { first_ptr.write(0xDEADBEEF) };
  println!("[1] Value written to first_block = 0x{:X}", unsafe { first_ptr.read() });

  print_program_break("after first alloc");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 12 bytes and a [u16; 16]. Both come out of the same free
  //    chunk without touching the program break.
  // --------------------------------------------------------------------
  let Some(second_block) = heap.allocate(12) else {
    return;
  };
  unsafe { ptr::write_bytes(second_block.as_ptr(), 0xAB, 12) };

  let Some(third_block) = heap.allocate(16 * size_of::<u16>()) else {
    return;
  };
  let third_ptr = third_block.as_ptr() as *mut u16;
  for i in 0..16 {
    unsafe { third_ptr.add(i).write(i as u16) };
  }

  println!("\n[2] Allocate [u8; 12] at {:?} and [u16; 16] at {:?}", second_block, third_block);
  print_chunks(&heap);
  print_program_break("after small allocs");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Release the middle block. It has used neighbours on both sides, so
  //    it stays a separate free chunk.
  // --------------------------------------------------------------------
  unsafe { heap.release(second_block.as_ptr()) };
  println!("\n[3] Released second_block at {:?}", second_block);
  print_chunks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Allocate 2 bytes to see if the heap reuses the freed block.
  // --------------------------------------------------------------------
  let Some(fourth_block) = heap.allocate(2) else {
    return;
  };
  println!("\n[4] Allocate [u8; 2] (check reuse of freed block)");
  println!(
    "[4] fourth_block == second_block? {}",
    if fourth_block == second_block {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  print_chunks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Allocate a large block to observe heap growth.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");

  let Some(big_block) = heap.allocate(64 * 1024) else {
    return;
  };
  println!("\n[5] Allocate large 64 KiB block at {:?}", big_block);
  print_chunks(&heap);

  print_program_break("after large alloc");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) Release everything. Neighbouring free chunks merge as they go, and
  //    the heap ends as a single free chunk.
  // --------------------------------------------------------------------
  unsafe {
    heap.release(first_block.as_ptr());
    heap.release(third_block.as_ptr());
    heap.release(fourth_block.as_ptr());
    heap.release(big_block.as_ptr());
  }
  println!("\n[6] Released every block");
  print_chunks(&heap);

  match heap.check() {
    Ok(()) => println!("[6] Heap check passed"),
    Err(err) => println!("[6] Heap check failed: {err}"),
  }

  // The program break never moves back down. The OS reclaims all memory
  // when the process exits.
  print_program_break("end");
}
