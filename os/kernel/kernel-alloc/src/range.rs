use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage};
use core::fmt;

/// A run of physically contiguous 4 KiB frames.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysRange {
    start: PhysicalPage,
    frames: u64,
}

impl PhysRange {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalPage, frames: u64) -> Self {
        Self { start, frames }
    }

    #[inline]
    #[must_use]
    pub const fn single(frame: PhysicalPage) -> Self {
        Self::new(frame, 1)
    }

    #[inline]
    #[must_use]
    pub const fn start(self) -> PhysicalPage {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn frames(self) -> u64 {
        self.frames
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        self.frames * PAGE_SIZE
    }

    /// First byte past the range.
    #[inline]
    #[must_use]
    pub const fn end(self) -> PhysicalAddress {
        PhysicalAddress::new(self.start.base().as_u64() + self.size())
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, addr: PhysicalAddress) -> bool {
        addr.as_u64() >= self.start.base().as_u64() && addr.as_u64() < self.end().as_u64()
    }

    /// Frames of the range in ascending order.
    pub fn iter(self) -> impl Iterator<Item = PhysicalPage> {
        let first = self.start.number();
        (first..first + self.frames).map(PhysicalPage::from_number)
    }
}

impl fmt::Display for PhysRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start.base(), self.end())
    }
}

impl fmt::Debug for PhysRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysRange({self})")
    }
}
