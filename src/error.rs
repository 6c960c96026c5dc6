//! Error types for arena operations.

use thiserror::Error;

/// Result type alias for arena operations.
pub type Result<T> = core::result::Result<T, ArenaError>;

/// Arena failures. Every variant is recoverable and leaves the arena unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
  /// The request does not fit in the space the arena has left.
  #[error("arena exhausted: requested {requested} bytes, {available} available")]
  Exhausted { requested: usize, available: usize },

  /// The upstream allocator could not supply a backing block.
  #[error("upstream allocator failed to supply {requested} bytes")]
  Upstream { requested: usize },

  /// The pointer is null or not a live allocation of this arena.
  #[error("unknown pointer {address:#x}")]
  UnknownPointer { address: usize },

  /// Zero-byte requests have no distinct address to track.
  #[error("zero-sized allocation")]
  ZeroSized,
}

impl ArenaError {
  pub(crate) fn unknown(address: *mut u8) -> Self {
    ArenaError::UnknownPointer {
      address: address as usize,
    }
  }

  /// Whether the failure means "not enough memory", from either the arena
  /// itself or its upstream allocator.
  pub fn is_out_of_memory(&self) -> bool {
    matches!(self, ArenaError::Exhausted { .. } | ArenaError::Upstream { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_messages() {
    let exhausted = ArenaError::Exhausted {
      requested: 70,
      available: 60,
    };
    assert_eq!(
      exhausted.to_string(),
      "arena exhausted: requested 70 bytes, 60 available"
    );

    let unknown = ArenaError::unknown(std::ptr::null_mut());
    assert_eq!(unknown.to_string(), "unknown pointer 0x0");
  }

  #[test]
  fn test_out_of_memory_classification() {
    assert!(ArenaError::Upstream { requested: 8 }.is_out_of_memory());
    assert!(
      ArenaError::Exhausted {
        requested: 8,
        available: 0
      }
      .is_out_of_memory()
    );
    assert!(!ArenaError::ZeroSized.is_out_of_memory());
    assert!(!ArenaError::UnknownPointer { address: 16 }.is_out_of_memory());
  }
}
