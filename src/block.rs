use std::ptr::NonNull;

/// A contiguous span of memory: either a main block owned by an arena or a
/// free sub-span of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
  pub address: NonNull<u8>,
  pub size: usize,
}

impl Block {
  pub fn new(
    address: NonNull<u8>,
    size: usize,
  ) -> Self {
    Self { address, size }
  }

  #[inline]
  pub fn start(&self) -> usize {
    self.address.as_ptr() as usize
  }

  /// One past the last byte of the block.
  #[inline]
  pub fn end(&self) -> usize {
    self.start() + self.size
  }

  /// Returns true when `next` starts exactly where `self` ends.
  pub fn precedes(
    &self,
    next: &Block,
  ) -> bool {
    self.end() == next.start()
  }

  /// Shrinks the block to `bytes` and returns the remainder, if any.
  pub fn split_off(
    &mut self,
    bytes: usize,
  ) -> Option<Block> {
    if bytes >= self.size {
      return None;
    }

    // SAFETY: `bytes < self.size`, so the offset stays inside the block.
    let remainder = unsafe { NonNull::new_unchecked(self.address.as_ptr().add(bytes)) };
    let rest = Block::new(remainder, self.size - bytes);
    self.size = bytes;

    Some(rest)
  }

  /// Sort key used by the free list: smallest first, lowest address on ties.
  #[inline]
  pub(crate) fn fit_key(&self) -> (usize, usize) {
    (self.size, self.start())
  }
}
