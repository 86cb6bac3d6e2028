//! # Physical and Virtual Address Types
//!
//! Zero-cost wrappers that keep physical and virtual addresses apart at
//! compile time. The scheduler, the page-table tree and the physical frame
//! allocator all speak in these types instead of raw `u64`s.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte address in physical memory (RAM or MMIO). |
//! | [`PhysicalPage`] | A 4 KiB aligned physical frame base. |
//! | [`VirtualAddress`] | A page-table translated address. |
//!
//! Only 4 KiB granularity is modelled. The page-table tree built on top of
//! these types terminates every walk at level 1, so huge pages never appear.
//!
//! ## Address-space halves
//!
//! A canonical 48-bit virtual address belongs to one of two halves, selected
//! by bit 47 (and sign-extended into bits 48..=63):
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌──────────────────────┐
//!                       │  user half           │  PML4 slots 0..256
//! 0x0000_7FFF_FFFF_FFFF ├──────────────────────┤
//!                       │  non-canonical hole  │
//! 0xFFFF_8000_0000_0000 ├──────────────────────┤
//!                       │  kernel half         │  PML4 slots 256..512
//! 0xFFFF_FFFF_FFFF_FFFF └──────────────────────┘
//! ```
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0000_0040_0020_1234);
//! assert!(va.is_user_half());
//! assert_eq!(va.table_index(1), 0x001);
//! assert_eq!(va.page_offset(), 0x234);
//!
//! let pa = PhysicalAddress::new(0x0010_2042);
//! assert_eq!(pa.page().base().as_u64(), 0x0010_2000);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod physical_page;
mod virtual_address;

pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;

/// Size of the only supported page granularity, in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Number of entries in every page-table node, regardless of level.
pub const ENTRIES_PER_TABLE: usize = 512;

/// First root (level 4) slot that belongs to the kernel half.
pub const KERNEL_HALF_FIRST_SLOT: usize = ENTRIES_PER_TABLE / 2;

/// Align `x` down to a page boundary.
#[inline(always)]
#[must_use]
pub const fn page_align_down(x: u64) -> u64 {
    x & !(PAGE_SIZE - 1)
}

/// Align `x` up to a page boundary.
///
/// `x + PAGE_SIZE - 1` must not overflow.
#[inline(always)]
#[must_use]
pub const fn page_align_up(x: u64) -> u64 {
    (x + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Number of pages needed to cover `bytes`. Defined for every `u64`.
#[inline]
#[must_use]
pub const fn pages_for(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE)
}
