//! Simulated physical RAM for the page-table tests.
//!
//! Physical addresses are byte offsets into a vector of 4 KiB-aligned
//! frames. A bitmap allocator over the same frames hands them out, and every
//! free is recorded so tests can check exactly what a teardown released.

use crate::{KernelRoot, Level, PageEntry, PageTable, PhysMapper, PhysicalMemory, PmmError};
use core::cell::{RefCell, UnsafeCell};
use kernel_alloc::{BitmapFrameAlloc, PhysRange};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};

/// A 4 KiB-aligned raw frame.
#[repr(C, align(4096))]
struct Aligned4K([u8; 4096]);

pub struct TestPhys {
    frames: Vec<UnsafeCell<Aligned4K>>,
    pmm: RefCell<BitmapFrameAlloc<4>>,
    freed: RefCell<Vec<PhysicalPage>>,
    kernel_frames: RefCell<Vec<PhysicalPage>>,
}

impl TestPhys {
    /// Kernel address mapped by [`kernel_root_with_half_populated`](Self::kernel_root_with_half_populated).
    pub const KERNEL_VA: VirtualAddress = VirtualAddress::new(0xffff_8000_0010_0000);

    pub fn with_frames(n: usize) -> Self {
        let frames = (0..n).map(|_| UnsafeCell::new(Aligned4K([0; 4096]))).collect();
        Self {
            frames,
            pmm: RefCell::new(BitmapFrameAlloc::new(PhysicalAddress::zero(), n as u64)),
            freed: RefCell::new(Vec::new()),
            kernel_frames: RefCell::new(Vec::new()),
        }
    }

    pub fn used(&self) -> u64 {
        self.pmm.borrow().used_frames()
    }

    pub fn freed(&self) -> Vec<PhysicalPage> {
        self.freed.borrow().clone()
    }

    pub fn table(&self, page: PhysicalPage) -> &mut PageTable {
        unsafe { self.phys_to_mut(page.base()) }
    }

    fn kernel_frame(&self) -> PhysicalPage {
        let page = self.alloc_frame().unwrap();
        self.table(page).zero();
        self.kernel_frames.borrow_mut().push(page);
        page
    }

    pub fn is_kernel_frame(&self, page: PhysicalPage) -> bool {
        self.kernel_frames.borrow().contains(&page)
    }

    /// A kernel root with one kernel page mapped at [`Self::KERNEL_VA`].
    pub fn kernel_root_with_half_populated(&self) -> KernelRoot {
        let mut node = self.kernel_frame();
        let root = KernelRoot::adopt(node);

        let mut level = Level::Pml4;
        while let Some(lower) = level.lower() {
            let next = self.kernel_frame();
            self.table(node)
                .set(level.index_of(Self::KERNEL_VA), PageEntry::kernel_rw().with_frame(next));
            node = next;
            level = lower;
        }
        let leaf = self.kernel_frame();
        self.table(node).set(
            Level::Pt.index_of(Self::KERNEL_VA),
            PageEntry::kernel_rw().with_global_translation(true).with_frame(leaf),
        );
        root
    }

    pub fn kernel_half_snapshot(&self, root: &KernelRoot) -> Vec<PageEntry> {
        self.table(root.page()).kernel_half().to_vec()
    }

    /// Translate through `root` directly, without an address space.
    pub fn kernel_query(&self, root: &KernelRoot, va: VirtualAddress) -> Option<PhysicalAddress> {
        let mut node = root.page();
        let mut level = Level::Pml4;
        loop {
            let target = self.table(node).get(level.index_of(va)).target()?;
            match level.lower() {
                Some(lower) => {
                    node = target;
                    level = lower;
                }
                None => return Some(target.base() + va.page_offset()),
            }
        }
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let idx = (pa.as_u64() >> 12) as usize;
        // Page tables always start at a frame boundary.
        debug_assert_eq!(pa.page_offset(), 0);

        // SAFETY: The caller promises `T` matches the bytes in the frame.
        unsafe { &mut *self.frames[idx].get().cast::<T>() }
    }
}

impl PhysicalMemory for TestPhys {
    fn alloc_range(&self, size: u64) -> Result<PhysRange, PmmError> {
        self.pmm.borrow_mut().alloc_range(size)
    }

    fn free(&self, range: PhysRange) -> Result<(), PmmError> {
        self.pmm.borrow_mut().free(range)?;
        self.freed.borrow_mut().extend(range.iter());
        Ok(())
    }
}
