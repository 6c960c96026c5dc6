/// Rounds `value` up to the machine word size.
///
/// # Examples
///
/// ```rust
/// use rarena::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, ::core::mem::size_of::<usize>())
  };
}

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use rarena::align_to;
///
/// assert_eq!(align_to!(0, 8), 0);
/// assert_eq!(align_to!(9, 8), 16);
/// assert_eq!(align_to!(33, 32), 64);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $alignment:expr) => {
    ($value + $alignment - 1) & !($alignment - 1)
  };
}

#[cfg(test)]
mod tests {
  use std::mem;

  #[test]
  fn test_align_table() {
    let word = mem::size_of::<usize>();

    // (value, alignment, expected)
    let cases = [
      (0, word, 0),
      (1, word, word),
      (word, word, word),
      (word + 1, word, 2 * word),
      (0, 1, 0),
      (5, 1, 5),
      (3, 2, 4),
      (9, 8, 16),
      (16, 16, 16),
      (17, 16, 32),
      (65, 64, 128),
      (0x1001, 8, 0x1008),
      (0x1001, 64, 0x1040),
    ];

    for (value, alignment, expected) in cases {
      assert_eq!(align_to!(value, alignment), expected, "align_to!({value}, {alignment})");
      if alignment == word {
        assert_eq!(align!(value), expected, "align!({value})");
      }
    }
  }

  #[test]
  fn test_padded_request_fits_aligned_value() {
    // A request of `size + align - 1` bytes at any start address still holds
    // an aligned value of `size` bytes.
    for alignment in [1usize, 2, 4, 8, 16, 64] {
      let size = alignment * 3;
      for start in 0x2000..0x2000 + alignment {
        let aligned = align_to!(start, alignment);
        assert_eq!(aligned % alignment, 0);
        assert!(aligned + size <= start + size + alignment - 1);
      }
    }
  }
}
