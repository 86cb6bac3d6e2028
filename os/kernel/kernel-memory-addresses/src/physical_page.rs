use crate::{PAGE_SHIFT, PAGE_SIZE, PhysicalAddress};
use core::fmt;

/// A 4 KiB aligned physical frame.
///
/// ### Invariants
/// - The low 12 bits of the base are always zero.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage(PhysicalAddress);

impl PhysicalPage {
    /// Frame that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(PhysicalAddress::new(addr.as_u64() & !(PAGE_SIZE - 1)))
    }

    /// Frame starting at `addr`, which must already be aligned.
    ///
    /// Panics in debug builds if unaligned.
    #[inline]
    #[must_use]
    pub fn from_aligned(addr: PhysicalAddress) -> Self {
        debug_assert!(addr.is_page_aligned(), "unaligned frame address {addr}");
        Self::containing(addr)
    }

    /// Frame with the given frame number (`base >> 12`).
    #[inline]
    #[must_use]
    pub const fn from_number(pfn: u64) -> Self {
        Self(PhysicalAddress::new(pfn << PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u64 {
        self.0.as_u64() >> PAGE_SHIFT
    }
}

impl fmt::Display for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4K", self.0)
    }
}

impl fmt::Debug for PhysicalPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage({:#018X})", self.0.as_u64())
    }
}
