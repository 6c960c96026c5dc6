//! Typed values on top of a byte arena.
//!
//! ```text
//!   ObjectArena
//!   ├── arena       byte-level MemoryArena (bump or free-list)
//!   └── finalizers  [drop A] [drop B] [drop C]  ──► run C, B, A on clear/drop
//! ```
//!
//! Values are dropped in reverse allocation order when the arena is cleared
//! or dropped. Individual values cannot be freed: references handed out by
//! [`ObjectArena::alloc`] live as long as the shared borrow of the arena, and
//! clearing needs exclusive access.
//!
//! Stored values may borrow data, as long as that data outlives the arena:
//!
//! ```
//! use rarena::{BasicMemoryArena, ObjectArena, SystemAllocator};
//!
//! struct Label<'s>(&'s str);
//!
//! impl Drop for Label<'_> {
//!     fn drop(&mut self) {
//!         assert!(!self.0.is_empty());
//!     }
//! }
//!
//! let name = String::from("outlives the arena");
//! let arena = ObjectArena::new(BasicMemoryArena::new(64, SystemAllocator).unwrap());
//! arena.alloc(Label(&name)).unwrap();
//! ```
//!
//! A borrow that ends before the arena is dropped is rejected, since the
//! value's destructor would run after the data is gone:
//!
//! ```compile_fail
//! use rarena::{BasicMemoryArena, ObjectArena, SystemAllocator};
//!
//! struct Label<'s>(&'s String);
//!
//! impl Drop for Label<'_> {
//!     fn drop(&mut self) {
//!         println!("{}", self.0);
//!     }
//! }
//!
//! let arena = ObjectArena::new(BasicMemoryArena::new(64, SystemAllocator).unwrap());
//! {
//!     let short_lived = String::from("gone before the arena");
//!     arena.alloc(Label(&short_lived)).unwrap();
//! }
//! ```

use std::{
  alloc::Layout,
  cell::RefCell,
  marker::PhantomData,
  mem,
  ptr::{self, NonNull},
};

use crate::{align_to, arena::MemoryArena, error::Result};

struct Finalizer {
  address: NonNull<u8>,
  drop_value: unsafe fn(NonNull<u8>),
}

unsafe fn drop_value<T>(address: NonNull<u8>) {
  unsafe { ptr::drop_in_place(address.cast::<T>().as_ptr()) }
}

/// Typed values over a byte arena. Every value outlives `'a`, and `'a`
/// outlives the arena, so finalizers never see dead borrows.
pub struct ObjectArena<'a, A: MemoryArena> {
  arena: RefCell<A>,
  finalizers: RefCell<Vec<Finalizer>>,
  // Invariant: a shared borrow of the arena must not shrink `'a`.
  _values: PhantomData<fn(&'a ()) -> &'a ()>,
}

impl<'a, A: MemoryArena> ObjectArena<'a, A> {
  pub fn new(arena: A) -> Self {
    Self {
      arena: RefCell::new(arena),
      finalizers: RefCell::new(Vec::new()),
      _values: PhantomData,
    }
  }

  /// Moves `value` into the arena, aligned for `T`.
  ///
  /// The request is padded by `align - 1` bytes since the byte arenas make
  /// no alignment promise. Zero-sized values take no arena space.
  #[allow(clippy::mut_from_ref)]
  pub fn alloc<T: 'a>(
    &self,
    value: T,
  ) -> Result<&mut T> {
    let layout = Layout::new::<T>();

    let address = if layout.size() == 0 {
      NonNull::<T>::dangling().cast::<u8>()
    } else {
      let raw = self
        .arena
        .borrow_mut()
        .allocate(layout.size() + layout.align() - 1)?;
      let start = raw.as_ptr() as usize;
      let aligned = align_to!(start, layout.align());
      // SAFETY: the padding is below `align`, inside the padded request.
      unsafe { raw.add(aligned - start) }
    };

    let typed = address.cast::<T>();
    // SAFETY: `typed` is aligned and points to unused space sized for `T`.
    unsafe { typed.as_ptr().write(value) };

    if mem::needs_drop::<T>() {
      self.finalizers.borrow_mut().push(Finalizer {
        address,
        drop_value: drop_value::<T>,
      });
    }

    // SAFETY: the region is handed out once and stays valid until `clear`
    // or drop, both of which need `&mut self`.
    Ok(unsafe { &mut *typed.as_ptr() })
  }

  /// Drops every value in reverse order, then clears the byte arena.
  pub fn clear(&mut self) {
    self.run_finalizers();
    self.arena.get_mut().clear();
  }

  pub fn allocated_bytes(&self) -> usize {
    self.arena.borrow().allocated_bytes()
  }

  pub fn free_bytes(&self) -> usize {
    self.arena.borrow().free_bytes()
  }

  /// Number of values still waiting to be dropped.
  pub fn pending_finalizers(&self) -> usize {
    self.finalizers.borrow().len()
  }

  fn run_finalizers(&mut self) {
    let finalizers = mem::take(self.finalizers.get_mut());

    log::debug!("object arena: running {} finalizers", finalizers.len());

    for finalizer in finalizers.into_iter().rev() {
      // SAFETY: each finalizer matches the type written at its address and
      // runs once, since the list was taken.
      unsafe { (finalizer.drop_value)(finalizer.address) }
    }
  }
}

impl<A: MemoryArena> Drop for ObjectArena<'_, A> {
  fn drop(&mut self) {
    self.run_finalizers();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{AdvancedMemoryArena, ArenaError, BasicMemoryArena, SystemAllocator};
  use std::{cell::RefCell, rc::Rc};

  struct Tracked {
    id: u32,
    log: Rc<RefCell<Vec<u32>>>,
  }

  impl Drop for Tracked {
    fn drop(&mut self) {
      self.log.borrow_mut().push(self.id);
    }
  }

  #[repr(align(64))]
  struct CacheLine([u8; 64]);

  #[test]
  fn test_values_are_written_and_aligned() {
    let arena = ObjectArena::new(BasicMemoryArena::new(1024, SystemAllocator).unwrap());

    let byte = arena.alloc(7u8).unwrap();
    let word = arena.alloc(0x1122_3344_5566_7788u64).unwrap();
    let line = arena.alloc(CacheLine([9; 64])).unwrap();

    assert_eq!(*byte, 7);
    assert_eq!(*word, 0x1122_3344_5566_7788);
    assert_eq!(ptr::addr_of!(*word) as usize % mem::align_of::<u64>(), 0);
    assert_eq!(ptr::addr_of!(*line) as usize % 64, 0);
    assert!(line.0.iter().all(|b| *b == 9));

    *word += 1;
    assert_eq!(*word, 0x1122_3344_5566_7789);
  }

  #[test]
  fn test_finalizers_run_in_reverse_on_clear() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut arena = ObjectArena::new(AdvancedMemoryArena::new(256, SystemAllocator).unwrap());

    for id in 1..=3 {
      arena
        .alloc(Tracked {
          id,
          log: Rc::clone(&log),
        })
        .unwrap();
    }
    arena.alloc(42u32).unwrap();
    assert_eq!(arena.pending_finalizers(), 3);

    arena.clear();

    assert_eq!(*log.borrow(), vec![3, 2, 1]);
    assert_eq!(arena.pending_finalizers(), 0);
    assert_eq!(arena.allocated_bytes(), 0);
    assert_eq!(arena.free_bytes(), 256);
  }

  #[test]
  fn test_finalizers_run_on_drop() {
    let log = Rc::new(RefCell::new(Vec::new()));
    {
      let arena = ObjectArena::new(BasicMemoryArena::new(128, SystemAllocator).unwrap());
      arena
        .alloc(Tracked {
          id: 1,
          log: Rc::clone(&log),
        })
        .unwrap();
      arena.alloc(String::from("arena-owned")).unwrap();
      arena
        .alloc(Tracked {
          id: 2,
          log: Rc::clone(&log),
        })
        .unwrap();
    }

    assert_eq!(*log.borrow(), vec![2, 1]);
    assert_eq!(Rc::strong_count(&log), 1);
  }

  struct Borrowing<'s> {
    text: &'s String,
    seen: Rc<RefCell<Vec<String>>>,
  }

  impl Drop for Borrowing<'_> {
    fn drop(&mut self) {
      self.seen.borrow_mut().push(self.text.clone());
    }
  }

  #[test]
  fn test_finalizer_reads_borrow_that_outlives_arena() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let text = String::from("still alive");
    {
      let arena = ObjectArena::new(AdvancedMemoryArena::new(128, SystemAllocator).unwrap());
      arena
        .alloc(Borrowing {
          text: &text,
          seen: Rc::clone(&seen),
        })
        .unwrap();
      for _ in 0..4 {
        arena.alloc(String::from("XXXXXXXXXXXX")).unwrap();
      }
    }

    assert_eq!(*seen.borrow(), vec![String::from("still alive")]);
  }

  #[test]
  fn test_zero_sized_values_take_no_space() {
    let arena = ObjectArena::new(BasicMemoryArena::new(8, SystemAllocator).unwrap());

    arena.alloc(()).unwrap();
    arena.alloc([0u64; 0]).unwrap();

    assert_eq!(arena.allocated_bytes(), 0);
  }

  #[test]
  fn test_exhaustion_is_reported() {
    let arena = ObjectArena::new(BasicMemoryArena::new(8, SystemAllocator).unwrap());

    assert!(matches!(
      arena.alloc([0u8; 16]),
      Err(ArenaError::Exhausted { requested: 16, .. })
    ));
    assert_eq!(arena.pending_finalizers(), 0);
  }
}
