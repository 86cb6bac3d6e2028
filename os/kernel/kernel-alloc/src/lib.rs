//! # Physical Memory Boundary
//!
//! Everything above this crate treats physical memory as an opaque service
//! that hands out and takes back page-aligned ranges:
//!
//! ```text
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │  AddressSpace (vmem)      │   │  Bootstrap (kernel)       │
//! └────────────┬──────────────┘   └────────────┬──────────────┘
//!              │ alloc_range / free            │
//! ┌────────────▼───────────────────────────────▼──────────────┐
//! │  PhysicalMemory  (trait)                                  │
//! │    BitmapFrameAlloc  ─ one bit per 4 KiB frame            │
//! └────────────┬──────────────────────────────────────────────┘
//!              │ phys_to_mut
//! ┌────────────▼──────────────────────────────────────────────┐
//! │  PhysMapper  (trait)                                      │
//! │    HhdmPhysMapper  ─ HHDM_BASE + pa                       │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The allocator reports failure as [`PmmError`] and never halts on its own.
//! Whether running out of frames is fatal is the caller's decision; the
//! kernel's bootstrap path treats it that way.
//!
//! ## Example
//! ```rust
//! use core::cell::RefCell;
//! use kernel_alloc::{PhysicalMemory, frame_alloc::BitmapFrameAlloc};
//! use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
//!
//! let pmm = RefCell::new(BitmapFrameAlloc::<1>::new(PhysicalAddress::new(0x10_0000), 64));
//! let range = pmm.alloc_range(3 * PAGE_SIZE).unwrap();
//! assert_eq!(range.frames(), 3);
//! pmm.free(range).unwrap();
//! assert_eq!(pmm.borrow().free_frames(), 64);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod frame_alloc;
pub mod phys_mapper;
mod range;
mod shared;

use core::cell::RefCell;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage};

pub use frame_alloc::BitmapFrameAlloc;
pub use phys_mapper::{HhdmPhysMapper, PhysMapper};
pub use range::PhysRange;
pub use shared::{FramePool, SharedFrames};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PmmError {
    #[error("a zero-sized range was requested")]
    ZeroSize,
    #[error("no run of {frames} free frames is left")]
    OutOfMemory { frames: u64 },
    #[error("range {0} lies outside the managed region")]
    OutOfRegion(PhysRange),
    #[error("frame at {0} is not allocated")]
    NotAllocated(PhysicalAddress),
    #[error("the frame pool is not installed yet")]
    Uninitialized,
    #[error("the frame pool is already installed")]
    AlreadyInitialized,
}

/// Hands out and takes back page-aligned physical ranges.
///
/// Methods take `&self`: implementations are shared by every address space
/// and synchronize internally (a `RefCell` in tests, a `Critical` cell in
/// the kernel).
pub trait PhysicalMemory {
    /// Allocate a physically contiguous range covering at least `size` bytes.
    ///
    /// # Errors
    /// [`PmmError::ZeroSize`] for `size == 0`, [`PmmError::OutOfMemory`]
    /// when no large enough run of free frames exists.
    fn alloc_range(&self, size: u64) -> Result<PhysRange, PmmError>;

    /// Return a range obtained from [`alloc_range`](Self::alloc_range).
    ///
    /// # Errors
    /// The range is outside the managed region or contains a frame that is
    /// not currently allocated.
    fn free(&self, range: PhysRange) -> Result<(), PmmError>;

    /// Allocate a single 4 KiB frame.
    ///
    /// # Errors
    /// See [`alloc_range`](Self::alloc_range).
    fn alloc_frame(&self) -> Result<PhysicalPage, PmmError> {
        self.alloc_range(PAGE_SIZE).map(PhysRange::start)
    }

    /// Free a single 4 KiB frame.
    ///
    /// # Errors
    /// See [`free`](Self::free).
    fn free_frame(&self, frame: PhysicalPage) -> Result<(), PmmError> {
        self.free(PhysRange::single(frame))
    }
}

impl<const WORDS: usize> PhysicalMemory for RefCell<BitmapFrameAlloc<WORDS>> {
    fn alloc_range(&self, size: u64) -> Result<PhysRange, PmmError> {
        self.borrow_mut().alloc_range(size)
    }

    fn free(&self, range: PhysRange) -> Result<(), PmmError> {
        self.borrow_mut().free(range)
    }
}
