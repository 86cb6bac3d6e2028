use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// CR3: root page-table base (IA-32e paging, PCID disabled).
///
/// Selects the level-4 node the MMU walks from. Loading a task's address
/// space means writing its root frame here.
#[bitfield(u64)]
pub struct Cr3 {
    #[bits(3)]
    __reserved0: u8,

    /// PWT: write-through caching for root table accesses.
    pub pwt: bool,

    /// PCD: cache disable for root table accesses.
    pub pcd: bool,

    #[bits(7)]
    __reserved1: u8,

    /// Root frame number (physical base `>> 12`).
    #[bits(40)]
    root_pfn: u64,

    #[bits(12)]
    __reserved2: u16,
}

impl Cr3 {
    /// CR3 value that selects `root` with default caching.
    #[inline]
    #[must_use]
    pub const fn from_root(root: PhysicalPage) -> Self {
        Self::new().with_root_pfn(root.number())
    }

    /// The level-4 root frame.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalPage {
        PhysicalPage::from_number(self.root_pfn())
    }

    /// Physical base of the root, as printed in fault diagnostics.
    #[inline]
    #[must_use]
    pub const fn root_address(&self) -> PhysicalAddress {
        self.root().base()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
