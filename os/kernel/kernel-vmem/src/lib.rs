//! # Virtual Memory Support
//!
//! Per-task x86-64 address spaces built from 4 KiB page-table nodes.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into four levels of page tables,
//! each level containing 512 (2⁹) entries of 8 bytes each:
//!
//! ```text
//!  PML4 (L4)  →  PDPT (L3)  →  PD (L2)  →  PT (L1)  →  4 KiB frame
//! ```
//!
//! | Level | Table | Entries reference |
//! |:------|:------|:------------------|
//! | 4 | PML4 | a PDPT; one PML4 per address space, loaded into CR3 |
//! | 3 | PDPT | a PD |
//! | 2 | PD   | a PT |
//! | 1 | PT   | a leaf frame |
//!
//! Huge pages are never created; every walk ends at level 1.
//!
//! ## What you get
//! - [`PageEntry`]: the raw entry bitfield.
//! - [`PageTable`] and [`Level`]: one node and its position in the tree.
//! - [`KernelRoot`]: the boot-time root whose upper half every space shares.
//! - [`AddressSpace`]: create, map/unmap/query, transfer, destroy.
//!
//! Frames come from a [`PhysicalMemory`] and are reached through a
//! [`PhysMapper`], both from `kernel-alloc`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod entry;
mod table;
#[cfg(test)]
mod test_phys;

pub use crate::address_space::AddressSpace;
pub use crate::entry::PageEntry;
pub use crate::table::{Level, PageTable, Span};
pub use kernel_alloc::{PhysMapper, PhysicalMemory, PmmError};

use kernel_memory_addresses::PhysicalPage;
use kernel_memory_addresses::VirtualAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmemError {
    #[error("physical memory: {0}")]
    Alloc(#[from] PmmError),
    #[error("ownership of the address space was transferred")]
    Transferred,
    #[error("{0} is in the shared kernel half")]
    KernelHalf(VirtualAddress),
    #[error("{0} is not canonical")]
    NonCanonical(VirtualAddress),
    #[error("{0} is not page aligned")]
    Unaligned(VirtualAddress),
    #[error("{0} is already mapped")]
    AlreadyMapped(VirtualAddress),
    #[error("{0} is not mapped")]
    NotMapped(VirtualAddress),
}

/// The boot-time root. Its upper half is the one kernel mapping set shared
/// by every [`AddressSpace`]; it is never freed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KernelRoot {
    page: PhysicalPage,
}

impl KernelRoot {
    /// Allocate a zeroed root for the bootstrap to populate.
    ///
    /// # Errors
    /// [`VmemError::Alloc`] if no frame is left.
    pub fn allocate<P: PhysicalMemory, M: PhysMapper>(pmm: &P, mapper: &M) -> Result<Self, VmemError> {
        let page = pmm.alloc_frame()?;
        let table = unsafe { mapper.phys_to_mut::<PageTable>(page.base()) };
        table.zero();
        log::debug!("vmem: kernel root at {page}");
        Ok(Self { page })
    }

    /// Use an existing level-4 node as the kernel root.
    #[must_use]
    pub const fn adopt(page: PhysicalPage) -> Self {
        Self { page }
    }

    /// Adopt the root the CPU is currently translating through.
    ///
    /// # Safety
    /// Must run at CPL0 with paging enabled.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    #[must_use]
    pub unsafe fn from_current() -> Self {
        use kernel_registers::LoadRegisterUnsafe;
        use kernel_registers::cr3::Cr3;

        let cr3 = unsafe { Cr3::load_unsafe() };
        Self::adopt(cr3.root())
    }

    #[inline]
    #[must_use]
    pub const fn page(&self) -> PhysicalPage {
        self.page
    }
}
