use std::{mem, ptr::NonNull};

use crate::{
  arena::MemoryArena,
  block::Block,
  config::{ArenaConfig, CoalescePolicy},
  error::{ArenaError, Result},
  mapper::AllocationMapper,
  upstream::{SystemAllocator, UpstreamAllocator},
};

/// Free-list arena over a growable set of backing blocks.
///
/// ```text
///   main block 0                        main block 1
///   ┌──────┬──────┬──────┬──────────┐   ┌──────────────┐
///   │ live │ free │ live │   free   │   │     live     │
///   └──────┴──────┴──────┴──────────┘   └──────────────┘
///            │             │
///            ▼             ▼
///   free list (ascending size): [free 16] [free 40]
/// ```
///
/// Allocation takes the smallest free block that fits and splits off the
/// remainder. When nothing fits, adjacent free blocks are merged and the
/// search retried; after that a new main block of exactly the requested size
/// is obtained from the upstream allocator. Main blocks are only returned
/// upstream when the arena is dropped.
pub struct AdvancedMemoryArena<U: UpstreamAllocator = SystemAllocator> {
  upstream: U,
  main_blocks: Vec<Block>,
  /// Sorted by `(size, address)`.
  free_blocks: Vec<Block>,
  mapper: AllocationMapper,
  coalesce: CoalescePolicy,
}

// SAFETY: the arena exclusively owns its main blocks; no raw address is
// shared with another arena.
unsafe impl<U: UpstreamAllocator + Send> Send for AdvancedMemoryArena<U> {}

impl<U: UpstreamAllocator> AdvancedMemoryArena<U> {
  /// Acquires a first main block of `size` bytes from `upstream`. A zero
  /// size starts the arena empty; it then grows on the first allocation.
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
    let mut arena = Self {
      upstream,
      main_blocks: Vec::new(),
      free_blocks: Vec::new(),
      mapper: AllocationMapper::new(),
      coalesce: config.coalesce,
    };

    if config.initial_size > 0 {
      let block = arena.acquire(config.initial_size)?;
      arena.free_blocks.push(block);
    }

    log::debug!(
      "advanced arena: created with {} bytes, {:?} coalescing",
      config.initial_size,
      config.coalesce
    );

    Ok(arena)
  }

  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    if bytes == 0 {
      return Err(ArenaError::ZeroSized);
    }

    let address = match self.take_fitting(bytes) {
      Some(address) => address,
      None => {
        let fitting = if self.merge_free_blocks() > 0 {
          self.take_fitting(bytes)
        } else {
          None
        };

        match fitting {
          Some(address) => address,
          None => self.acquire(bytes)?.address,
        }
      }
    };

    let tracked = self.mapper.allocate(address.as_ptr(), bytes);
    debug_assert!(tracked, "free list handed out a live address");

    log::trace!("advanced arena: allocated {} bytes at {:?}", bytes, address);
    Ok(address)
  }

  /// Returns a live allocation to the free list. Merging with its neighbours
  /// waits for the next merge pass unless the policy is
  /// [`CoalescePolicy::Eager`].
  pub fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    let Some(start) = NonNull::new(address) else {
      log::warn!("advanced arena: rejected deallocation of null");
      return Err(ArenaError::unknown(address));
    };

    let bytes = self.mapper.allocation_size(address);
    if !self.mapper.deallocate(address) {
      log::warn!("advanced arena: rejected deallocation of {:?}", address);
      return Err(ArenaError::unknown(address));
    }

    self.insert_free(Block::new(start, bytes));
    log::trace!("advanced arena: released {} bytes at {:?}", bytes, start);

    if self.coalesce == CoalescePolicy::Eager {
      self.merge_free_blocks();
    }

    Ok(())
  }

  /// Makes every main block entirely free again and forgets all live
  /// allocations.
  pub fn clear(&mut self) {
    log::debug!(
      "advanced arena: clearing {} live allocations over {} main blocks",
      self.mapper.len(),
      self.main_blocks.len()
    );

    self.free_blocks.clone_from(&self.main_blocks);
    self.free_blocks.sort_unstable_by_key(Block::fit_key);
    self.mapper.deallocate_all();
  }

  pub fn allocated_bytes(&self) -> usize {
    self.mapper.allocated_bytes()
  }

  pub fn free_bytes(&self) -> usize {
    self.free_blocks.iter().map(|block| block.size).sum()
  }

  /// Combined size of all main blocks.
  pub fn total_bytes(&self) -> usize {
    self.main_blocks.iter().map(|block| block.size).sum()
  }

  pub fn main_block_count(&self) -> usize {
    self.main_blocks.len()
  }

  pub fn free_block_count(&self) -> usize {
    self.free_blocks.len()
  }

  pub fn largest_free_block(&self) -> usize {
    self.free_blocks.last().map_or(0, |block| block.size)
  }

  /// Checks the structural invariants: the free list is ordered, every free
  /// block lies inside exactly one main block, free blocks are disjoint, and
  /// free plus allocated bytes add up to the main block total.
  pub fn is_consistent(&self) -> bool {
    let ordered = self
      .free_blocks
      .windows(2)
      .all(|pair| pair[0].fit_key() <= pair[1].fit_key());

    let contained = self.free_blocks.iter().all(|free| {
      self
        .main_blocks
        .iter()
        .filter(|main| main.start() <= free.start() && free.end() <= main.end())
        .count()
        == 1
    });

    let mut by_address = self.free_blocks.clone();
    by_address.sort_unstable_by_key(Block::start);
    let disjoint = by_address
      .windows(2)
      .all(|pair| pair[0].end() <= pair[1].start());

    let balanced = self.free_bytes() + self.allocated_bytes() == self.total_bytes();

    ordered && contained && disjoint && balanced
  }

  /// Removes the smallest free block of at least `bytes` bytes, putting any
  /// surplus back on the free list.
  fn take_fitting(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let index = self.free_blocks.partition_point(|block| block.size < bytes);
    if index == self.free_blocks.len() {
      return None;
    }

    let mut block = self.free_blocks.remove(index);
    if let Some(rest) = block.split_off(bytes) {
      self.insert_free(rest);
    }

    Some(block.address)
  }

  fn insert_free(
    &mut self,
    block: Block,
  ) {
    let key = block.fit_key();
    let index = self.free_blocks.partition_point(|free| free.fit_key() < key);
    self.free_blocks.insert(index, block);
  }

  /// Joins free blocks that touch inside the same main block. Returns the
  /// number of blocks absorbed.
  fn merge_free_blocks(&mut self) -> usize {
    if self.free_blocks.len() < 2 {
      return 0;
    }

    let mut blocks = mem::take(&mut self.free_blocks);
    blocks.sort_unstable_by_key(Block::start);

    let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut absorbed = 0;

    for block in blocks {
      if let Some(last) = merged.last_mut() {
        // A main block's first byte never continues another main block.
        if last.precedes(&block) && !self.is_main_start(&block) {
          last.size += block.size;
          absorbed += 1;
          continue;
        }
      }
      merged.push(block);
    }

    merged.sort_unstable_by_key(Block::fit_key);
    self.free_blocks = merged;

    log::debug!(
      "advanced arena: merge pass absorbed {} blocks, {} free blocks left",
      absorbed,
      self.free_blocks.len()
    );

    absorbed
  }

  fn is_main_start(
    &self,
    block: &Block,
  ) -> bool {
    self.main_blocks.iter().any(|main| main.address == block.address)
  }

  /// Obtains a new main block from upstream. Nothing changes on failure.
  fn acquire(
    &mut self,
    bytes: usize,
  ) -> Result<Block> {
    let Some(address) = self.upstream.allocate(bytes) else {
      log::warn!("advanced arena: upstream failed to supply {} bytes", bytes);
      return Err(ArenaError::Upstream { requested: bytes });
    };

    let block = Block::new(address, bytes);
    self.main_blocks.push(block);

    log::debug!(
      "advanced arena: main block {} of {} bytes at {:?}",
      self.main_blocks.len(),
      bytes,
      address
    );

    Ok(block)
  }
}

impl<U: UpstreamAllocator> MemoryArena for AdvancedMemoryArena<U> {
  fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>> {
    AdvancedMemoryArena::allocate(self, bytes)
  }

  fn deallocate(
    &mut self,
    address: *mut u8,
  ) -> Result<()> {
    AdvancedMemoryArena::deallocate(self, address)
  }

  fn clear(&mut self) {
    AdvancedMemoryArena::clear(self)
  }

  fn allocated_bytes(&self) -> usize {
    AdvancedMemoryArena::allocated_bytes(self)
  }

  fn free_bytes(&self) -> usize {
    AdvancedMemoryArena::free_bytes(self)
  }
}

impl<U: UpstreamAllocator> Drop for AdvancedMemoryArena<U> {
  fn drop(&mut self) {
    log::debug!(
      "advanced arena: returning {} main blocks upstream",
      self.main_blocks.len()
    );

    for block in self.main_blocks.drain(..) {
      // SAFETY: each main block came from this upstream with this size and
      // is drained, so it is returned exactly once.
      unsafe { self.upstream.deallocate(block.address, block.size) }
    }
  }
}
