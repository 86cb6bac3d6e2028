//! # Physical memory and the kernel heap
//!
//! The frame allocator manages the usable region the loader reports. It is
//! the one mutable resource shared between normal code and the timer trap
//! (which frees the stacks of reaped tasks), so it sits in a critical cell.
//! [`KERNEL_PMM`] is the handle address spaces and the heap use.
//!
//! The heap has no arena of its own: every allocation is a run of whole
//! frames, addressed through the higher-half direct map.

use crate::CPU;
use crate::boot::BootError;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use kernel_alloc::{BitmapFrameAlloc, FramePool, PhysRange, PhysicalMemory, SharedFrames};
use kernel_info::boot::PhysRegion;
use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage, page_align_down, page_align_up, pages_for};
use kernel_sync::X86Interrupts;
use log::{info, warn};

/// Bitmap words; each covers 64 frames (256 KiB).
const FRAME_WORDS: usize = 1024;

type Frames = BitmapFrameAlloc<FRAME_WORDS>;

static PMM: FramePool<FRAME_WORDS> = FramePool::new();

/// The kernel's [`PhysicalMemory`]: the global frame pool behind an
/// interrupt guard and a spin flag.
pub type KernelPmm = SharedFrames<'static, FRAME_WORDS, X86Interrupts>;

pub static KERNEL_PMM: KernelPmm = SharedFrames::new(&PMM, &CPU);

/// Take over `usable` as the frame pool. Frames past the bitmap's capacity
/// are left unused.
pub fn init(usable: PhysRegion) -> Result<(), BootError> {
    let base = page_align_up(usable.base);
    let end = page_align_down(usable.end());
    if end <= base {
        return Err(BootError::NoUsableMemory(usable));
    }

    let frames = (end - base) / PAGE_SIZE;
    if frames > Frames::CAPACITY {
        warn!(
            "pmm: {frames} usable frames, managing the first {}",
            Frames::CAPACITY
        );
    }

    let pmm = Frames::new(PhysicalAddress::new(base), frames);
    info!(
        "pmm: {} ({} frames free)",
        pmm.region(),
        pmm.free_frames()
    );
    KERNEL_PMM.install(pmm)?;
    Ok(())
}

/// Global allocator handing out whole frames through the direct map.
struct FrameHeap;

#[global_allocator]
static HEAP: FrameHeap = FrameHeap;

unsafe impl GlobalAlloc for FrameHeap {
    /// Page-aligned runs only; alignments above a page fail.
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() as u64 > PAGE_SIZE {
            return ptr::null_mut();
        }

        match KERNEL_PMM.alloc_range(layout.size() as u64) {
            Ok(range) => (HHDM_BASE + range.start().base().as_u64()) as *mut u8,
            Err(e) => {
                warn!("heap: {e}");
                ptr::null_mut()
            }
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if ptr.is_null() {
            return;
        }

        let pa = PhysicalAddress::new(ptr as u64 - HHDM_BASE);
        let range = PhysRange::new(PhysicalPage::containing(pa), pages_for(layout.size() as u64));
        if let Err(e) = KERNEL_PMM.free(range) {
            warn!("heap: {e}");
        }
    }
}
