use std::{
  ptr::NonNull,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use libc::c_void;

/// Source of the backing blocks an arena carves allocations out of.
pub trait UpstreamAllocator {
  /// Returns a block of at least `bytes` bytes, or `None` if none is available.
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;

  /// Returns a block to the allocator.
  ///
  /// # Safety
  ///
  /// `address` must come from `allocate` on this allocator with the same
  /// `bytes`, and must not be returned twice.
  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    bytes: usize,
  );
}

impl<U: UpstreamAllocator + ?Sized> UpstreamAllocator for &U {
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    (**self).allocate(bytes)
  }

  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    bytes: usize,
  ) {
    unsafe { (**self).deallocate(address, bytes) }
  }
}

impl<U: UpstreamAllocator + ?Sized> UpstreamAllocator for Box<U> {
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    (**self).allocate(bytes)
  }

  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    bytes: usize,
  ) {
    unsafe { (**self).deallocate(address, bytes) }
  }
}

impl<U: UpstreamAllocator + ?Sized> UpstreamAllocator for Arc<U> {
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    (**self).allocate(bytes)
  }

  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    bytes: usize,
  ) {
    unsafe { (**self).deallocate(address, bytes) }
  }
}

/// The process heap, through `malloc(3)` and `free(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl UpstreamAllocator for SystemAllocator {
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    if bytes == 0 {
      return None;
    }

    // SAFETY: malloc has no preconditions; a null result is handled below.
    let address = unsafe { libc::malloc(bytes) } as *mut u8;
    NonNull::new(address)
  }

  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    _bytes: usize,
  ) {
    unsafe { libc::free(address.as_ptr() as *mut c_void) }
  }
}

/// Wraps another upstream allocator with a fixed byte budget.
///
/// Requests that would take the live total past the budget are refused. The
/// live byte and block counters make it possible to observe how many backing
/// blocks an arena is holding.
#[derive(Debug)]
pub struct BoundedAllocator<U = SystemAllocator> {
  inner: U,
  limit: usize,
  live_bytes: AtomicUsize,
  live_blocks: AtomicUsize,
}

impl BoundedAllocator<SystemAllocator> {
  pub fn system(limit: usize) -> Self {
    Self::new(SystemAllocator, limit)
  }
}

impl<U: UpstreamAllocator> BoundedAllocator<U> {
  pub fn new(
    inner: U,
    limit: usize,
  ) -> Self {
    Self {
      inner,
      limit,
      live_bytes: AtomicUsize::new(0),
      live_blocks: AtomicUsize::new(0),
    }
  }

  pub fn live_bytes(&self) -> usize {
    self.live_bytes.load(Ordering::Acquire)
  }

  pub fn live_blocks(&self) -> usize {
    self.live_blocks.load(Ordering::Acquire)
  }

  fn reserve(
    &self,
    bytes: usize,
  ) -> bool {
    self
      .live_bytes
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
        live.checked_add(bytes).filter(|total| *total <= self.limit)
      })
      .is_ok()
  }
}

impl<U: UpstreamAllocator> UpstreamAllocator for BoundedAllocator<U> {
  fn allocate(
    &self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    if !self.reserve(bytes) {
      log::debug!(
        "bounded upstream refused {} bytes ({} of {} in use)",
        bytes,
        self.live_bytes(),
        self.limit
      );
      return None;
    }

    match self.inner.allocate(bytes) {
      Some(address) => {
        self.live_blocks.fetch_add(1, Ordering::AcqRel);
        Some(address)
      }
      None => {
        self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
        None
      }
    }
  }

  unsafe fn deallocate(
    &self,
    address: NonNull<u8>,
    bytes: usize,
  ) {
    unsafe { self.inner.deallocate(address, bytes) };
    self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
    self.live_blocks.fetch_sub(1, Ordering::AcqRel);
  }
}
