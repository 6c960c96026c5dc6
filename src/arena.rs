use std::ptr::NonNull;

use crate::error::Result;

/// Operations shared by every arena kind.
///
/// Returned pointers are lent to the caller: they stay valid until they are
/// passed to [`deallocate`](MemoryArena::deallocate), the arena is cleared, or
/// the arena is dropped. Callers must never hand them to the upstream
/// allocator directly.
pub trait MemoryArena {
  /// Reserves `bytes` bytes. The returned address carries no alignment
  /// guarantee beyond that of the backing block.
  fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>>;

  /// Releases a live allocation. Null or unknown pointers are rejected
  /// without touching any state.
  fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()>;

  /// Forgets every live allocation at once.
  fn clear(&mut self);

  fn allocated_bytes(&self) -> usize;

  fn free_bytes(&self) -> usize;
}

impl<A: MemoryArena + ?Sized> MemoryArena for Box<A> {
  fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    (**self).allocate(bytes)
  }

  fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    (**self).deallocate(address)
  }

  fn clear(&mut self) {
    (**self).clear()
  }

  fn allocated_bytes(&self) -> usize {
    (**self).allocated_bytes()
  }

  fn free_bytes(&self) -> usize {
    (**self).free_bytes()
  }
}
