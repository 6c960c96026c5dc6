use rarena::{
  AdvancedMemoryArena, ArenaConfig, BasicMemoryArena, BoundedAllocator, CoalescePolicy, ObjectArena,
};

/// Prints how the arena's bytes are split between live and free.
fn print_usage(
  label: &str,
  allocated: usize,
  free: usize,
) {
  println!("[{}] allocated = {}, free = {}", label, allocated, free);
}

fn main() -> rarena::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

  // The upstream budget makes growth visible: every main block the advanced
  // arena requests shows up in `live_blocks`.
  let upstream = BoundedAllocator::system(64 * 1024);

  // --------------------------------------------------------------------
  // 1) Bump arena: 100 bytes, allocations advance a cursor.
  // --------------------------------------------------------------------
  let mut bump = BasicMemoryArena::new(100, &upstream)?;

  let first = bump.allocate(40)?;
  println!("\n[1] Allocated 40 bytes at {:?}", first);
  print_usage("1", bump.allocated_bytes(), bump.free_bytes());

  match bump.allocate(70) {
    Ok(_) => unreachable!("40 + 70 does not fit in 100 bytes"),
    Err(err) => println!("[1] Allocate(70) failed: {}", err),
  }

  let second = bump.allocate(60)?;
  println!("[1] Allocated 60 bytes at {:?}", second);

  // Freeing the most recent allocation hands its bytes back to the cursor.
  bump.deallocate(second.as_ptr())?;
  println!("[1] Freed the tail, {} bytes past the cursor", bump.remaining());

  bump.clear();
  print_usage("1 cleared", bump.allocated_bytes(), bump.free_bytes());

  // --------------------------------------------------------------------
  // 2) Advanced arena: split, free, merge, grow.
  // --------------------------------------------------------------------
  let config = ArenaConfig::builder()
    .initial_size(30)
    .coalesce(CoalescePolicy::Deferred)
    .build();
  let mut arena = AdvancedMemoryArena::with_config(config, &upstream)?;

  let a = arena.allocate(10)?;
  let b = arena.allocate(10)?;
  let c = arena.allocate(10)?;
  println!("\n[2] Three 10 byte blocks at {:?}, {:?}, {:?}", a, b, c);

  unsafe {
    a.as_ptr().write_bytes(0xAA, 10);
    c.as_ptr().write_bytes(0xCC, 10);
  }

  arena.deallocate(a.as_ptr())?;
  arena.deallocate(b.as_ptr())?;
  arena.deallocate(c.as_ptr())?;
  println!(
    "[2] Freed all three: {} free blocks, {} main blocks",
    arena.free_block_count(),
    arena.main_block_count()
  );

  // Nothing of 30 bytes is on the free list, so this runs a merge pass.
  let whole = arena.allocate(30)?;
  println!(
    "[2] Allocate(30) reused {:?} after merging, still {} main block(s)",
    whole,
    arena.main_block_count()
  );

  // No free space left at all: the arena grows.
  let grown = arena.allocate(64)?;
  println!(
    "[2] Allocate(64) at {:?}, now {} main blocks, {} upstream blocks live",
    grown,
    arena.main_block_count(),
    upstream.live_blocks()
  );
  print_usage("2", arena.allocated_bytes(), arena.free_bytes());

  // --------------------------------------------------------------------
  // 3) Typed values with finalizers on top of the advanced arena.
  // --------------------------------------------------------------------
  arena.clear();
  let objects = ObjectArena::new(arena);

  let name = objects.alloc(String::from("arena-owned string"))?;
  let counters = objects.alloc([0u64; 4])?;
  counters[2] = 7;
  println!("\n[3] {} / {:?}", name, counters);
  print_usage("3", objects.allocated_bytes(), objects.free_bytes());

  drop(objects);
  drop(bump);

  println!(
    "\n[4] End of example. {} bytes still held upstream.",
    upstream.live_bytes()
  );

  Ok(())
}
