//! Bitmap-backed physical frame allocator.
//!
//! One bit per 4 KiB frame of a fixed region, `1 = in use`. No heap: the
//! bitmap is a const-sized array, so the allocator can live in a `static`
//! before anything else is up.

use crate::{PmmError, PhysRange};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, pages_for};
use log::{debug, trace};

/// Manages `frames` consecutive frames starting at `base`.
///
/// `WORDS` sizes the bitmap; the region may use fewer bits than
/// `WORDS * 64`, the rest are permanently marked used.
pub struct BitmapFrameAlloc<const WORDS: usize> {
    base: PhysicalPage,
    frames: u64,
    used: u64,
    bitmap: [u64; WORDS],
}

impl<const WORDS: usize> BitmapFrameAlloc<WORDS> {
    /// Bits available in the bitmap.
    pub const CAPACITY: u64 = WORDS as u64 * 64;

    /// Allocator over `[base .. base + frames * 4K)`, all frames free.
    ///
    /// `base` is aligned down; `frames` is clamped to [`Self::CAPACITY`].
    #[must_use]
    pub const fn new(base: PhysicalAddress, frames: u64) -> Self {
        let frames = if frames > Self::CAPACITY { Self::CAPACITY } else { frames };
        let mut bitmap = [0u64; WORDS];

        // Mark the tail beyond the region as used.
        let mut bit = frames;
        while bit < Self::CAPACITY {
            bitmap[(bit / 64) as usize] |= 1 << (bit % 64);
            bit += 1;
        }

        Self {
            base: PhysicalPage::containing(base),
            frames,
            used: 0,
            bitmap,
        }
    }

    /// The managed region.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> PhysRange {
        PhysRange::new(self.base, self.frames)
    }

    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> u64 {
        self.frames - self.used
    }

    #[inline]
    #[must_use]
    pub const fn used_frames(&self) -> u64 {
        self.used
    }

    #[inline]
    const fn is_used(&self, idx: u64) -> bool {
        self.bitmap[(idx / 64) as usize] & (1 << (idx % 64)) != 0
    }

    #[inline]
    const fn set(&mut self, idx: u64, used: bool) {
        let word = &mut self.bitmap[(idx / 64) as usize];
        if used {
            *word |= 1 << (idx % 64);
        } else {
            *word &= !(1 << (idx % 64));
        }
    }

    fn index_of(&self, range: PhysRange) -> Result<u64, PmmError> {
        let first = range.start().number();
        let base = self.base.number();
        let past_end = first
            .checked_add(range.frames())
            .is_none_or(|end| end > base + self.frames);
        if first < base || past_end {
            return Err(PmmError::OutOfRegion(range));
        }
        Ok(first - base)
    }

    /// Mark `range` as in use without handing it out (firmware, kernel image).
    ///
    /// Frames already in use stay in use.
    ///
    /// # Errors
    /// [`PmmError::OutOfRegion`] if `range` leaves the managed region.
    pub fn reserve(&mut self, range: PhysRange) -> Result<(), PmmError> {
        let first = self.index_of(range)?;
        for idx in first..first + range.frames() {
            if !self.is_used(idx) {
                self.set(idx, true);
                self.used += 1;
            }
        }
        debug!("pmm: reserved {range}");
        Ok(())
    }

    /// First-fit search for `frames` contiguous free frames.
    fn find_run(&self, frames: u64) -> Option<u64> {
        let mut run_start = 0;
        let mut run_len = 0;
        for idx in 0..self.frames {
            if self.is_used(idx) {
                run_len = 0;
                run_start = idx + 1;
                continue;
            }
            run_len += 1;
            if run_len == frames {
                return Some(run_start);
            }
        }
        None
    }

    /// Allocate a contiguous range of at least `size` bytes.
    ///
    /// # Errors
    /// [`PmmError::ZeroSize`] or [`PmmError::OutOfMemory`].
    pub fn alloc_range(&mut self, size: u64) -> Result<PhysRange, PmmError> {
        if size == 0 {
            return Err(PmmError::ZeroSize);
        }

        let frames = pages_for(size);
        let first = self.find_run(frames).ok_or(PmmError::OutOfMemory { frames })?;
        for idx in first..first + frames {
            self.set(idx, true);
        }
        self.used += frames;

        let range = PhysRange::new(PhysicalPage::from_number(self.base.number() + first), frames);
        trace!("pmm: alloc {range}");
        Ok(range)
    }

    /// Release `range`. Nothing is changed if any frame is not in use.
    ///
    /// # Errors
    /// [`PmmError::OutOfRegion`] or [`PmmError::NotAllocated`].
    pub fn free(&mut self, range: PhysRange) -> Result<(), PmmError> {
        let first = self.index_of(range)?;
        if let Some(idx) = (first..first + range.frames()).find(|&i| !self.is_used(i)) {
            let frame = PhysicalPage::from_number(self.base.number() + idx);
            return Err(PmmError::NotAllocated(frame.base()));
        }

        for idx in first..first + range.frames() {
            self.set(idx, false);
        }
        self.used -= range.frames();
        trace!("pmm: free {range}");
        Ok(())
    }
}
