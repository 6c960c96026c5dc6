use std::ptr::NonNull;

use crate::{
  arena::MemoryArena,
  block::Block,
  config::ArenaConfig,
  error::{ArenaError, Result},
  mapper::AllocationMapper,
  upstream::{SystemAllocator, UpstreamAllocator},
};

/// Linear arena over a single backing block.
///
/// Allocation advances a cursor. Deallocation only drops the bookkeeping
/// entry, except for the most recent allocation, which hands its bytes back
/// to the cursor when `reclaim_tail` is enabled. Everything else is reclaimed
/// in bulk by [`clear`](BasicMemoryArena::clear).
pub struct BasicMemoryArena<U: UpstreamAllocator = SystemAllocator> {
  upstream: U,
  block: Block,
  consumed: usize,
  reclaim_tail: bool,
  mapper: AllocationMapper,
}

// SAFETY: the arena exclusively owns its backing block; the raw address is
// never shared with another arena.
unsafe impl<U: UpstreamAllocator + Send> Send for BasicMemoryArena<U> {}

impl<U: UpstreamAllocator> BasicMemoryArena<U> {
  /// Acquires a `size` byte block from `upstream`.
  pub fn new(
    size: usize,
    upstream: U,
  ) -> Result<Self> {
    Self::with_config(ArenaConfig::with_size(size), upstream)
  }

  pub fn with_config(
    config: ArenaConfig,
    upstream: U,
  ) -> Result<Self> {
    let size = config.initial_size;
    if size == 0 {
      return Err(ArenaError::ZeroSized);
    }

    let Some(address) = upstream.allocate(size) else {
      log::warn!("basic arena: upstream failed to supply {} bytes", size);
      return Err(ArenaError::Upstream { requested: size });
    };

    log::debug!("basic arena: acquired {} bytes at {:?}", size, address);

    Ok(Self {
      upstream,
      block: Block::new(address, size),
      consumed: 0,
      reclaim_tail: config.reclaim_tail,
      mapper: AllocationMapper::new(),
    })
  }

  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    if bytes == 0 {
      return Err(ArenaError::ZeroSized);
    }

    let available = self.remaining();
    if bytes > available {
      log::trace!("basic arena: {} bytes requested, {} left", bytes, available);
      return Err(ArenaError::Exhausted {
        requested: bytes,
        available,
      });
    }

    // SAFETY: `consumed + bytes <= block.size`, so the cursor stays in the block.
    let address = unsafe { self.block.address.add(self.consumed) };

    let tracked = self.mapper.allocate(address.as_ptr(), bytes);
    debug_assert!(tracked, "cursor handed out a live address twice");

    self.consumed += bytes;
    log::trace!("basic arena: allocated {} bytes at {:?}", bytes, address);

    Ok(address)
  }

  pub fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    let bytes = self.mapper.allocation_size(address);

    if !self.mapper.deallocate(address) {
      log::warn!("basic arena: rejected deallocation of {:?}", address);
      return Err(ArenaError::unknown(address));
    }

    let cursor = self.block.start() + self.consumed;
    if self.reclaim_tail && address as usize + bytes == cursor {
      self.consumed -= bytes;
      log::trace!("basic arena: reclaimed {} tail bytes at {:?}", bytes, address);
    } else {
      log::trace!("basic arena: released {} bytes at {:?}", bytes, address);
    }

    Ok(())
  }

  /// Rewinds the cursor and forgets all live allocations.
  pub fn clear(&mut self) {
    log::debug!(
      "basic arena: clearing {} live allocations",
      self.mapper.len()
    );
    self.consumed = 0;
    self.mapper.deallocate_all();
  }

  pub fn allocated_bytes(&self) -> usize {
    self.mapper.allocated_bytes()
  }

  /// Block size minus live bytes. Space released below the cursor counts as
  /// free here even though only [`clear`](Self::clear) makes it reusable; see
  /// [`remaining`](Self::remaining) for what the next allocation can get.
  pub fn free_bytes(&self) -> usize {
    self.block.size - self.mapper.allocated_bytes()
  }

  /// Bytes between the cursor and the end of the block.
  #[inline]
  pub fn remaining(&self) -> usize {
    self.block.size - self.consumed
  }

  #[inline]
  pub fn capacity(&self) -> usize {
    self.block.size
  }

  pub fn live_allocations(&self) -> usize {
    self.mapper.len()
  }
}

impl<U: UpstreamAllocator> MemoryArena for BasicMemoryArena<U> {
  fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    BasicMemoryArena::allocate(self, bytes)
  }

  fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    BasicMemoryArena::deallocate(self, address)
  }

  fn clear(&mut self) {
    BasicMemoryArena::clear(self)
  }

  fn allocated_bytes(&self) -> usize {
    BasicMemoryArena::allocated_bytes(self)
  }

  fn free_bytes(&self) -> usize {
    BasicMemoryArena::free_bytes(self)
  }
}

impl<U: UpstreamAllocator> Drop for BasicMemoryArena<U> {
  fn drop(&mut self) {
    log::debug!("basic arena: returning {} bytes upstream", self.block.size);
    // SAFETY: the block came from this upstream with this size and is
    // returned exactly once.
    unsafe { self.upstream.deallocate(self.block.address, self.block.size) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::upstream::BoundedAllocator;
  use std::ptr;

  #[test]
  fn test_bump_scenario() {
    let mut arena = BasicMemoryArena::new(100, SystemAllocator).unwrap();

    let first = arena.allocate(40).unwrap();
    assert_eq!(arena.allocated_bytes(), 40);

    assert_eq!(
      arena.allocate(70),
      Err(ArenaError::Exhausted {
        requested: 70,
        available: 60
      })
    );
    assert_eq!(arena.allocated_bytes(), 40);

    let second = arena.allocate(60).unwrap();
    assert_eq!(arena.allocated_bytes(), 100);
    assert_eq!(arena.free_bytes(), 0);
    assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 40);
  }

  #[test]
  fn test_alloc_memory_is_usable() {
    let mut arena = BasicMemoryArena::new(64, SystemAllocator).unwrap();

    unsafe {
      let first_addr = arena.allocate(8).unwrap().as_ptr() as *mut u64;
      first_addr.write_unaligned(3u64);

      let size: usize = 6;
      let second_addr = arena.allocate(size * 2).unwrap().as_ptr() as *mut u16;
      for i in 0..size {
        second_addr.add(i).write_unaligned((i + 1) as u16);
      }

      assert_eq!(first_addr.read_unaligned(), 3);
      for i in 0..size {
        assert_eq!((i + 1) as u16, second_addr.add(i).read_unaligned());
      }
    }
  }

  #[test]
  fn test_double_deallocate_fails() {
    let mut arena = BasicMemoryArena::new(64, SystemAllocator).unwrap();
    let a = arena.allocate(16).unwrap();
    arena.allocate(16).unwrap();

    assert!(arena.deallocate(a.as_ptr()).is_ok());
    let allocated = arena.allocated_bytes();

    assert_eq!(
      arena.deallocate(a.as_ptr()),
      Err(ArenaError::unknown(a.as_ptr()))
    );
    assert_eq!(arena.allocated_bytes(), allocated);
  }

  #[test]
  fn test_deallocate_null_fails() {
    let mut arena = BasicMemoryArena::new(16, SystemAllocator).unwrap();

    assert!(arena.deallocate(ptr::null_mut()).is_err());
    assert_eq!(arena.allocated_bytes(), 0);
  }

  #[test]
  fn test_non_tail_deallocate_keeps_cursor() {
    let mut arena = BasicMemoryArena::new(100, SystemAllocator).unwrap();
    let first = arena.allocate(30).unwrap();
    arena.allocate(30).unwrap();

    arena.deallocate(first.as_ptr()).unwrap();

    assert_eq!(arena.allocated_bytes(), 30);
    assert_eq!(arena.free_bytes(), 70);
    assert_eq!(arena.remaining(), 40);
    assert!(arena.allocate(50).is_err());
  }

  #[test]
  fn test_tail_deallocate_reclaims_space() {
    let mut arena = BasicMemoryArena::new(100, SystemAllocator).unwrap();
    arena.allocate(30).unwrap();
    let tail = arena.allocate(50).unwrap();

    arena.deallocate(tail.as_ptr()).unwrap();

    assert_eq!(arena.remaining(), 70);
    let again = arena.allocate(70).unwrap();
    assert_eq!(again, tail);
  }

  #[test]
  fn test_tail_reclaim_can_be_disabled() {
    let config = ArenaConfig::builder()
      .initial_size(100)
      .reclaim_tail(false)
      .build();
    let mut arena = BasicMemoryArena::with_config(config, SystemAllocator).unwrap();
    let tail = arena.allocate(50).unwrap();

    arena.deallocate(tail.as_ptr()).unwrap();

    assert_eq!(arena.remaining(), 50);
    assert_eq!(arena.free_bytes(), 100);
  }

  #[test]
  fn test_clear_is_idempotent() {
    let mut arena = BasicMemoryArena::new(64, SystemAllocator).unwrap();
    arena.allocate(10).unwrap();
    arena.allocate(20).unwrap();

    arena.clear();
    assert_eq!(arena.allocated_bytes(), 0);
    assert_eq!(arena.remaining(), 64);

    arena.clear();
    assert_eq!(arena.allocated_bytes(), 0);
    assert_eq!(arena.free_bytes(), 64);
    assert_eq!(arena.live_allocations(), 0);
    assert!(arena.allocate(64).is_ok());
  }

  #[test]
  fn test_zero_sized_requests_rejected() {
    assert!(matches!(
      BasicMemoryArena::new(0, SystemAllocator),
      Err(ArenaError::ZeroSized)
    ));

    let mut arena = BasicMemoryArena::new(8, SystemAllocator).unwrap();
    assert_eq!(arena.allocate(0), Err(ArenaError::ZeroSized));
  }

  #[test]
  fn test_upstream_failure_and_release() {
    let upstream = BoundedAllocator::system(32);

    assert!(matches!(
      BasicMemoryArena::new(64, &upstream),
      Err(ArenaError::Upstream { requested: 64 })
    ));

    {
      let mut arena = BasicMemoryArena::new(32, &upstream).unwrap();
      arena.allocate(32).unwrap();
      assert_eq!(upstream.live_bytes(), 32);
    }

    assert_eq!(upstream.live_bytes(), 0);
    assert_eq!(upstream.live_blocks(), 0);
  }
}
