use crate::{KERNEL_HALF_FIRST_SLOT, PAGE_SHIFT, PAGE_SIZE};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Virtual memory address.
///
/// Besides carrying intent, this type knows how a 48-bit address decomposes
/// into the four page-table indices:
///
/// ```text
/// | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
/// |  L4   |  L3   |  L2   |  L1   | Offset |
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Index into the page-table node at `level` (1..=4) for this address.
    ///
    /// Panics in debug builds if `level` is outside `1..=4`.
    #[inline]
    #[must_use]
    pub const fn table_index(self, level: u8) -> usize {
        debug_assert!(level >= 1 && level <= 4);
        let shift = PAGE_SHIFT + 9 * (level as u32 - 1);
        ((self.0 >> shift) & 0x1FF) as usize
    }

    /// Byte offset inside the 4 KiB page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    /// Whether bits 48..=63 are a sign extension of bit 47.
    #[inline]
    #[must_use]
    pub const fn is_canonical(self) -> bool {
        let upper = self.0 >> 47;
        upper == 0 || upper == 0x1_FFFF
    }

    /// Whether the address is translated through the user (lower) half of the root.
    #[inline]
    #[must_use]
    pub const fn is_user_half(self) -> bool {
        self.table_index(4) < KERNEL_HALF_FIRST_SLOT
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
