//! # rarena - Memory Arena Allocators
//!
//! This crate provides two arena allocators that carve variable-size
//! allocations out of backing blocks obtained from an upstream allocator,
//! plus the bookkeeping they share.
//!
//! ## Overview
//!
//! ```text
//!   Basic (bump) arena:
//!
//!   ┌─────┬─────┬─────┬─────┬───────────────────────────────────────┐
//!   │ A1  │ A2  │ A3  │ A4  │            Free Space                 │
//!   └─────┴─────┴─────┴─────┴───────────────────────────────────────┘
//!                           ▲                                       ▲
//!                        cursor                                block end
//!
//!   Each allocation bumps the cursor forward. Freeing the last allocation
//!   moves it back; everything else is reclaimed by clear().
//!
//!   Advanced (free-list) arena:
//!
//!   main blocks   ┌──────┬──────┬──────┬──────┐   ┌────────────┐
//!                 │ live │ free │ live │ free │   │    live    │
//!                 └──────┴──────┴──────┴──────┘   └────────────┘
//!   free list     [free 16] [free 40]        (ascending by size)
//!
//!   Allocation takes the smallest fitting free block and splits it.
//!   On a miss, adjacent free blocks are merged; if that does not help,
//!   a new main block is requested from the upstream allocator.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── arena      - MemoryArena trait shared by both arenas
//!   ├── block      - Block descriptors (address, size)
//!   ├── bump       - BasicMemoryArena
//!   ├── advanced   - AdvancedMemoryArena
//!   ├── mapper     - AllocationMapper (live address -> size)
//!   ├── upstream   - UpstreamAllocator, SystemAllocator, BoundedAllocator
//!   ├── config     - ArenaConfig and its builder
//!   ├── error      - ArenaError
//!   ├── shared     - SharedArena (one lock per arena)
//!   └── object     - ObjectArena (typed values with finalizers)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rarena::{AdvancedMemoryArena, SystemAllocator};
//!
//! let mut arena = AdvancedMemoryArena::new(1024, SystemAllocator).unwrap();
//!
//! let address = arena.allocate(64).unwrap();
//! unsafe { address.as_ptr().write_bytes(0, 64) };
//! assert_eq!(arena.allocated_bytes(), 64);
//!
//! arena.deallocate(address.as_ptr()).unwrap();
//! assert_eq!(arena.free_bytes(), 1024);
//! ```
//!
//! ## Failures
//!
//! Nothing in this crate aborts on memory pressure. Exhaustion, upstream
//! failure and deallocation of unknown pointers all come back as
//! [`ArenaError`] values, and a failed call leaves the arena unchanged.
//!
//! ## Safety
//!
//! The arenas hand out raw addresses. Writing through them is `unsafe` and
//! only valid until the address is deallocated, the arena is cleared, or the
//! arena is dropped. [`ObjectArena`] wraps this in a borrow-checked API.

pub mod align;
mod advanced;
mod arena;
mod block;
mod bump;
mod config;
mod error;
mod mapper;
mod object;
mod shared;
mod upstream;

pub use advanced::AdvancedMemoryArena;
pub use arena::MemoryArena;
pub use bump::BasicMemoryArena;
pub use config::{ArenaConfig, ArenaConfigBuilder, CoalescePolicy, DEFAULT_INITIAL_SIZE};
pub use error::{ArenaError, Result};
pub use mapper::AllocationMapper;
pub use object::ObjectArena;
pub use shared::SharedArena;
pub use upstream::{BoundedAllocator, SystemAllocator, UpstreamAllocator};
