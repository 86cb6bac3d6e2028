//! # Kernel Entry Point
//!
//! ```text
//!  loader ──► _start_kernel (boot stack) ──► kernel_entry ──► bootstrap
//!                                                             │
//!                  arm CPU control, unmask interrupts  ◄──────┘
//!                                │
//!                  idle loop (task 0) ◄──► timer ticks rotate the tasks
//! ```

#![no_std]
#![no_main]
#![allow(unsafe_code)]

mod arch;
mod boot;
mod gdt;
mod interrupts;
mod memory;
mod pic;
mod pit;
mod ports;
mod tasks;

use crate::arch::X86TrapArch;
use kernel_info::boot::KernelBootInfo;
use kernel_info::logging::DEFAULT_LEVEL;
use kernel_info::memory::BOOT_STACK_SIZE;
#[cfg(feature = "qemu")]
use kernel_qemu::Port;
#[cfg(not(feature = "qemu"))]
use kernel_qemu::SerialSink;
use kernel_qemu::{PortLogger, qemu_trace};
use kernel_registers::LoadRegister;
use kernel_registers::rflags::Rflags;
use kernel_sched::Scheduler;
use kernel_sync::{BootOnce, CpuControl, Critical, InterruptControl, X86Interrupts};
use kernel_trap::{Dispatcher, LockedScheduler};
use kernel_vmem::KernelRoot;
use log::{error, info};

#[cfg(feature = "qemu")]
type LogSink = Port;
#[cfg(feature = "qemu")]
const LOG_SINK: LogSink = Port::DEBUGCON;

#[cfg(not(feature = "qemu"))]
type LogSink = SerialSink;
#[cfg(not(feature = "qemu"))]
const LOG_SINK: LogSink = SerialSink::COM1;

static LOGGER: PortLogger<LogSink> = PortLogger::new(LOG_SINK, DEFAULT_LEVEL);

/// Interrupt masking for the one core.
pub static CPU: CpuControl<X86Interrupts> = CpuControl::new(X86Interrupts);

/// `None` until bootstrap has created the scheduler.
pub static SCHED: Critical<Option<Scheduler>> = Critical::new(None);

pub static DISPATCHER: BootOnce<Dispatcher<X86TrapArch>> = BootOnce::new();

/// The loader's level-4 table; every address space copies its upper half.
pub static KERNEL_ROOT: BootOnce<KernelRoot> = BootOnce::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    qemu_trace!("kernel panic: {info}\n");
    CPU.halt()
}

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<BOOT_STACK_SIZE> = Aligned([0; BOOT_STACK_SIZE]);

/// The kernel entry point.
///
/// # ABI
/// `win64`, as the loader is a UEFI (PE/COFF) application: `boot_info`
/// arrives in `RCX`.
///
/// # Naked function & Stack
/// The loader's stack is not ours to keep, so this switches to
/// [`BOOT_STACK`] before any Rust code runs. That stack becomes the idle
/// task's stack once the scheduler takes over.
#[unsafe(no_mangle)]
#[unsafe(naked)]
#[unsafe(link_section = ".text._start_kernel")]
pub extern "win64" fn _start_kernel(_boot_info: *const KernelBootInfo) {
    core::arch::naked_asm!(
        "cli",
        "mov r12, rcx",

        "lea rax, [rip + {stack_sym}]",
        "add rax, {stack_size}",
        "and rax, -16",
        "mov rsp, rax",
        // Emulate a CALL so that RSP % 16 == 8 at entry.
        "push 0",
        "xor rbp, rbp",

        "mov rdi, r12",
        "jmp {rust_entry}",
        stack_sym = sym BOOT_STACK,
        stack_size = const BOOT_STACK_SIZE,
        rust_entry = sym kernel_entry,
    );
}

/// Kernel entry on [`BOOT_STACK`], C ABI, `boot_info` in `RDI`.
extern "C" fn kernel_entry(boot_info: *const KernelBootInfo) -> ! {
    qemu_trace!("kernel: entered\n");
    #[cfg(not(feature = "qemu"))]
    LOGGER.sink().init();
    if LOGGER.init().is_err() {
        qemu_trace!("kernel: logger already installed\n");
    }

    // SAFETY: the loader passes a valid, identity-or-HHDM-reachable pointer.
    let Some(info) = (unsafe { boot_info.as_ref() }) else {
        error!("kernel: no boot info");
        CPU.halt()
    };
    info!("kernel: usable memory {:#x}..{:#x}", info.usable.base, info.usable.end());

    if let Err(e) = boot::bootstrap(info) {
        error!("kernel: bootstrap failed: {e}");
        CPU.halt()
    }

    CPU.arm();
    CPU.hardware().enable();
    debug_assert!(Rflags::load().if_interrupt_enable(), "IF clear after enable");
    info!("kernel: interrupts on, idling");

    loop {
        CPU.relax();
    }
}

/// Called by the trap trampoline with the address of the fresh trap frame;
/// returns the stack pointer to resume from.
pub(crate) extern "C" fn trap_dispatch(sp: u64) -> u64 {
    let Some(dispatcher) = DISPATCHER.get() else {
        qemu_trace!("kernel: trap before dispatch is ready, sp={sp:#x}\n");
        CPU.halt()
    };

    let mut sched = LockedScheduler::new(&SCHED, &CPU);
    // SAFETY: the trampoline passes its own frame with IF cleared.
    unsafe { dispatcher.dispatch(&CPU, &mut sched, sp) }
}
