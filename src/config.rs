/// Default size of an arena's first backing block (64 KiB).
pub const DEFAULT_INITIAL_SIZE: usize = 64 * 1024;

/// When the advanced arena merges adjacent free blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoalescePolicy {
  /// Merge only when an allocation finds no fitting block, and on clear.
  /// Deallocation stays a single sorted insert.
  #[default]
  Deferred,
  /// Run a merge pass after every deallocation.
  Eager,
}

/// Construction parameters shared by both arena kinds.
///
/// # Example
///
/// ```
/// use rarena::{ArenaConfig, CoalescePolicy};
///
/// let config = ArenaConfig::builder()
///     .initial_size(4096)
///     .coalesce(CoalescePolicy::Eager)
///     .build();
///
/// assert_eq!(config.initial_size, 4096);
/// assert!(config.reclaim_tail);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
  /// Size in bytes of the first backing block.
  pub initial_size: usize,
  /// Merge policy of the advanced arena.
  pub coalesce: CoalescePolicy,
  /// Whether the bump arena moves its cursor back when the most recent
  /// allocation is freed.
  pub reclaim_tail: bool,
}

impl Default for ArenaConfig {
  fn default() -> Self {
    Self {
      initial_size: DEFAULT_INITIAL_SIZE,
      coalesce: CoalescePolicy::default(),
      reclaim_tail: true,
    }
  }
}

impl ArenaConfig {
  pub fn builder() -> ArenaConfigBuilder {
    ArenaConfigBuilder(Self::default())
  }

  /// Default configuration with a different first block size.
  pub fn with_size(initial_size: usize) -> Self {
    Self {
      initial_size,
      ..Self::default()
    }
  }
}

/// Fluent builder for [`ArenaConfig`].
#[derive(Debug, Clone)]
pub struct ArenaConfigBuilder(ArenaConfig);

impl ArenaConfigBuilder {
  pub fn initial_size(
    mut self,
    bytes: usize,
  ) -> Self {
    self.0.initial_size = bytes;
    self
  }

  pub fn coalesce(
    mut self,
    policy: CoalescePolicy,
  ) -> Self {
    self.0.coalesce = policy;
    self
  }

  pub fn reclaim_tail(
    mut self,
    enabled: bool,
  ) -> Self {
    self.0.reclaim_tail = enabled;
    self
  }

  pub fn build(self) -> ArenaConfig {
    self.0
  }
}
