use crate::PageEntry;
use core::ops::Range;
use kernel_memory_addresses::{ENTRIES_PER_TABLE, KERNEL_HALF_FIRST_SLOT, VirtualAddress};

/// Level of a node in the 4-level tree; `Pml4` is the root, `Pt` holds leaves.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Pt = 1,
    Pd = 2,
    Pdpt = 3,
    Pml4 = 4,
}

impl Level {
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Level of the nodes this level's entries reference; `None` for leaves.
    #[inline]
    #[must_use]
    pub const fn lower(self) -> Option<Self> {
        match self {
            Self::Pml4 => Some(Self::Pdpt),
            Self::Pdpt => Some(Self::Pd),
            Self::Pd => Some(Self::Pt),
            Self::Pt => None,
        }
    }

    /// Index of the entry `va` selects at this level.
    #[inline]
    #[must_use]
    pub const fn index_of(self, va: VirtualAddress) -> usize {
        va.table_index(self.number())
    }
}

/// Which entries of a node a walk visits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Span {
    /// Every entry.
    All,
    /// Root slots `0..256` only; the kernel half is never touched.
    UserHalf,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn slots(self) -> Range<usize> {
        match self {
            Self::All => 0..ENTRIES_PER_TABLE,
            Self::UserHalf => 0..KERNEL_HALF_FIRST_SLOT,
        }
    }
}

/// One 4 KiB page-table node.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntry; ENTRIES_PER_TABLE],
}

impl PageTable {
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageEntry::ABSENT);
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: usize) -> PageEntry {
        self.entries[i]
    }

    #[inline]
    pub const fn set(&mut self, i: usize, e: PageEntry) {
        self.entries[i] = e;
    }

    /// Entries of the kernel half, root nodes only.
    #[inline]
    #[must_use]
    pub fn kernel_half(&self) -> &[PageEntry] {
        &self.entries[KERNEL_HALF_FIRST_SLOT..]
    }

    #[inline]
    pub fn kernel_half_mut(&mut self) -> &mut [PageEntry] {
        &mut self.entries[KERNEL_HALF_FIRST_SLOT..]
    }
}

const _: () = assert!(size_of::<PageTable>() == 4096);
