//! Physical-to-virtual access for code that edits physical memory.
//!
//! Page-table nodes live in physical frames, but the CPU only dereferences
//! virtual addresses. A [`PhysMapper`] bridges the two. In the kernel every
//! frame is reachable through the higher-half direct map; tests back frames
//! with host memory instead.

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysicalAddress;

/// Turns a physical address into a usable reference.
pub trait PhysMapper {
    /// # Safety
    /// `pa` must be mapped, suitably aligned for `T`, and not aliased by
    /// another live reference for `'a`.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// [`PhysMapper`] for a kernel with a higher-half direct map: `HHDM_BASE + pa`.
///
/// The HHDM must cover every physical address passed in.
#[derive(Copy, Clone, Debug, Default)]
pub struct HhdmPhysMapper;

impl PhysMapper for HhdmPhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = (HHDM_BASE + pa.as_u64()) as *mut T;
        // SAFETY: Caller must ensure the physical address is valid and mapped via HHDM.
        unsafe { &mut *va }
    }
}
