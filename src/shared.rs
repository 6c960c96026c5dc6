use std::ptr::NonNull;

use parking_lot::Mutex;

use crate::{arena::MemoryArena, error::Result};

/// An arena behind a single lock so it can be used from several threads.
///
/// Merge passes walk the whole free list, so the lock covers the arena as a
/// whole rather than individual blocks.
pub struct SharedArena<A> {
  inner: Mutex<A>,
}

impl<A: MemoryArena> SharedArena<A> {
  pub fn new(arena: A) -> Self {
    Self {
      inner: Mutex::new(arena),
    }
  }

  pub fn allocate(
    &self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    self.inner.lock().allocate(bytes)
  }

  pub fn deallocate(
    &self,
    address: *mut u8,
  ) -> Result<()> {
    self.inner.lock().deallocate(address)
  }

  pub fn clear(&self) {
    self.inner.lock().clear()
  }

  pub fn allocated_bytes(&self) -> usize {
    self.inner.lock().allocated_bytes()
  }

  pub fn free_bytes(&self) -> usize {
    self.inner.lock().free_bytes()
  }

  /// Runs `f` with the lock held, for compound operations and for
  /// arena-specific queries.
  pub fn with<R>(
    &self,
    f: impl FnOnce(&mut A) -> R,
  ) -> R {
    f(&mut self.inner.lock())
  }

  pub fn into_inner(self) -> A {
    self.inner.into_inner()
  }
}
