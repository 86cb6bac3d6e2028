//! # Bootstrap
//!
//! One-time bring-up on the boot CPU, with interrupts masked throughout:
//!
//! 1. GDT, IDT, PIC remap
//! 2. frame pool and heap
//! 3. kernel root (the loader's level-4 table) and an address-space self-check
//! 4. dispatcher and scheduler with the demo tasks
//! 5. PIT at [`TIMER_HZ`]
//!
//! The caller arms [`CPU`](crate::CPU) and unmasks interrupts afterwards.

use crate::arch::X86TrapArch;
use crate::memory::{self, KERNEL_PMM};
use crate::{CPU, DISPATCHER, KERNEL_ROOT, SCHED, gdt, interrupts, pic, pit, tasks};
use kernel_alloc::{HhdmPhysMapper, PhysicalMemory, PmmError};
use kernel_info::boot::{KernelBootInfo, PhysRegion};
use kernel_info::memory::TASK_STACK_SIZE;
use kernel_info::timer::TIMER_HZ;
use kernel_memory_addresses::VirtualAddress;
use kernel_sched::{Privilege, SchedError, Scheduler};
use kernel_trap::{Dispatcher, TrapError};
use kernel_vmem::{AddressSpace, KernelRoot, PageEntry, VmemError};
use log::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("no usable memory in {0:?}")]
    NoUsableMemory(PhysRegion),
    #[error("{0} initialized twice")]
    AlreadyInitialized(&'static str),
    #[error("address-space self-check: {0}")]
    SelfCheck(&'static str),
    #[error(transparent)]
    Pmm(#[from] PmmError),
    #[error(transparent)]
    Vmem(#[from] VmemError),
    #[error(transparent)]
    Sched(#[from] SchedError),
    #[error(transparent)]
    Trap(#[from] TrapError),
}

/// Bring the machine up to the point where enabling interrupts starts
/// preemptive scheduling.
pub fn bootstrap(info: &KernelBootInfo) -> Result<(), BootError> {
    // SAFETY: boot CPU, CPL0, interrupts masked since _start_kernel.
    unsafe {
        gdt::init();
        interrupts::init();
        pic::remap();
    }

    memory::init(info.usable)?;

    // SAFETY: paging is on; the loader's root maps the kernel half.
    let root = KERNEL_ROOT.get_or_init(|| unsafe { KernelRoot::from_current() });
    info!("vmem: kernel root {}", root.page());
    address_space_self_check(root)?;

    DISPATCHER
        .set(Dispatcher::new(X86TrapArch))
        .map_err(|_| BootError::AlreadyInitialized("dispatcher"))?;

    let mut sched = Scheduler::new(TASK_STACK_SIZE);
    sched.spawn("ticker-a", tasks::ticker as usize as u64, [1, 1000, 0, 0, 0], Privilege::Kernel)?;
    sched.spawn("ticker-b", tasks::ticker as usize as u64, [2, 1500, 0, 0, 0], Privilege::Kernel)?;
    sched.spawn("one-shot", tasks::one_shot as usize as u64, [3, 0, 0, 0, 0], Privilege::Kernel)?;
    info!("sched: {} tasks, idle included", sched.len());
    SCHED.with_lock(&CPU, |s| *s = Some(sched));

    // SAFETY: interrupts are still masked; the IDT routes IRQ 0 already.
    unsafe { pit::start(TIMER_HZ) };
    Ok(())
}

/// Build a throwaway address space, map one user page, tear it down, and
/// check that every frame came back.
fn address_space_self_check(root: &KernelRoot) -> Result<(), BootError> {
    let pmm = &KERNEL_PMM;
    let mapper = HhdmPhysMapper;
    let before = pmm.free_frames();

    let space = AddressSpace::create(pmm, &mapper, root)?;
    let va = VirtualAddress::new(0x0000_0040_0000_0000);
    let frame = pmm.alloc_frame()?;
    space.map(va, frame, PageEntry::user_rw())?;
    if space.query(va + 0x123) != Some(frame.base() + 0x123) {
        return Err(BootError::SelfCheck("query does not match the mapping"));
    }
    space.destroy()?;

    let after = pmm.free_frames();
    if after != before {
        warn!("vmem: self-check leaked {} frames", before.saturating_sub(after));
        return Err(BootError::SelfCheck("frames leaked"));
    }
    info!("vmem: self-check passed");
    Ok(())
}
