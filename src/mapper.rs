use std::collections::HashMap;

/// Bookkeeping table from live addresses to their allocation sizes.
///
/// The mapper never touches the memory it describes; arenas consult it to
/// validate deallocations and to report how many bytes are in use.
#[derive(Debug, Default)]
pub struct AllocationMapper {
  sizes: HashMap<usize, usize>,
  allocated: usize,
}

impl AllocationMapper {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records `address` as live with `bytes` bytes.
  ///
  /// Returns `false` without any effect if `address` is null or already live.
  pub fn allocate(
    &mut self,
    address: *mut u8,
    bytes: usize,
  ) -> bool {
    if address.is_null() {
      return false;
    }

    let key = address as usize;
    if self.sizes.contains_key(&key) {
      return false;
    }

    self.sizes.insert(key, bytes);
    self.allocated += bytes;
    true
  }

  /// Forgets `address`. Returns `false` if it is null or not live.
  pub fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> bool {
    if address.is_null() {
      return false;
    }

    match self.sizes.remove(&(address as usize)) {
      Some(bytes) => {
        self.allocated -= bytes;
        true
      }
      None => false,
    }
  }

  pub fn deallocate_all(&mut self) {
    self.sizes.clear();
    self.allocated = 0;
  }

  /// Size recorded for `address`, or zero when it is null or not live.
  pub fn allocation_size(
    &self,
    address: *mut u8,
  ) -> usize {
    self.sizes.get(&(address as usize)).copied().unwrap_or(0)
  }

  #[inline]
  pub fn allocated_bytes(&self) -> usize {
    self.allocated
  }

  /// Number of live allocations.
  #[inline]
  pub fn len(&self) -> usize {
    self.sizes.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.sizes.is_empty()
  }
}
