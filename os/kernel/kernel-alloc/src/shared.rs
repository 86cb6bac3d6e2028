//! The frame pool as the kernel shares it between normal code and traps.

use crate::{BitmapFrameAlloc, PhysRange, PhysicalMemory, PmmError};
use kernel_sync::{BootOnce, CpuControl, Critical, InterruptControl};

/// Storage for a pool that bootstrap installs once.
pub type FramePool<const WORDS: usize> = BootOnce<Critical<BitmapFrameAlloc<WORDS>>>;

/// [`PhysicalMemory`] over a [`FramePool`]; every call locks the pool with
/// interrupts masked on `cpu`.
///
/// Before the pool is installed every call fails with
/// [`PmmError::Uninitialized`].
pub struct SharedFrames<'a, const WORDS: usize, I: InterruptControl> {
    pool: &'a FramePool<WORDS>,
    cpu: &'a CpuControl<I>,
}

impl<'a, const WORDS: usize, I: InterruptControl> SharedFrames<'a, WORDS, I> {
    pub const fn new(pool: &'a FramePool<WORDS>, cpu: &'a CpuControl<I>) -> Self {
        Self { pool, cpu }
    }

    /// Install `frames` as the pool.
    ///
    /// # Errors
    /// [`PmmError::AlreadyInitialized`] if a pool was installed before.
    pub fn install(&self, frames: BitmapFrameAlloc<WORDS>) -> Result<(), PmmError> {
        self.pool
            .set(Critical::new(frames))
            .map(|_| ())
            .map_err(|_| PmmError::AlreadyInitialized)
    }

    /// Frames not handed out yet; `0` before installation.
    pub fn free_frames(&self) -> u64 {
        self.pool
            .get()
            .map_or(0, |pool| pool.with_lock(self.cpu, |frames| frames.free_frames()))
    }

    fn with_pool<R>(
        &self,
        f: impl FnOnce(&mut BitmapFrameAlloc<WORDS>) -> Result<R, PmmError>,
    ) -> Result<R, PmmError> {
        let pool = self.pool.get().ok_or(PmmError::Uninitialized)?;
        pool.with_lock(self.cpu, f)
    }
}

impl<const WORDS: usize, I: InterruptControl> PhysicalMemory for SharedFrames<'_, WORDS, I> {
    fn alloc_range(&self, size: u64) -> Result<PhysRange, PmmError> {
        self.with_pool(|frames| frames.alloc_range(size))
    }

    fn free(&self, range: PhysRange) -> Result<(), PmmError> {
        self.with_pool(|frames| frames.free(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage};

    #[derive(Default)]
    struct IfFlag(AtomicBool);

    impl InterruptControl for IfFlag {
        fn enable(&self) {
            self.0.store(true, Ordering::SeqCst);
        }

        fn disable(&self) {
            self.0.store(false, Ordering::SeqCst);
        }

        fn relax(&self) {}
    }

    fn frames(n: u64) -> BitmapFrameAlloc<1> {
        BitmapFrameAlloc::new(PhysicalAddress::new(0x0010_0000), n)
    }

    #[test]
    fn calls_before_install_report_uninitialized() {
        let pool = FramePool::<1>::new();
        let cpu = CpuControl::new(IfFlag::default());
        let pmm = SharedFrames::new(&pool, &cpu);

        assert_eq!(pmm.alloc_range(PAGE_SIZE), Err(PmmError::Uninitialized));
        let range = PhysRange::single(PhysicalPage::from_number(0x100));
        assert_eq!(pmm.free(range), Err(PmmError::Uninitialized));
        assert_eq!(pmm.free_frames(), 0);
    }

    #[test]
    fn installed_pool_serves_and_rejects_a_second_install() {
        let pool = FramePool::<1>::new();
        let cpu = CpuControl::new(IfFlag::default());
        cpu.hardware().enable();
        cpu.arm();
        let pmm = SharedFrames::new(&pool, &cpu);

        pmm.install(frames(8)).unwrap();
        assert_eq!(pmm.install(frames(4)), Err(PmmError::AlreadyInitialized));

        let range = pmm.alloc_range(2 * PAGE_SIZE).unwrap();
        assert_eq!(pmm.free_frames(), 6);
        pmm.free(range).unwrap();
        assert_eq!(pmm.free_frames(), 8);

        assert_eq!(cpu.depth(), 0);
        assert!(cpu.hardware().0.load(Ordering::SeqCst));
    }
}
