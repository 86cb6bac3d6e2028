//! # Memory Layout

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel executes (VMA), matches the linker script.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Where the bytes are placed in *physical* memory (LMA) before paging.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// First address of the kernel half; everything below belongs to user space.
pub const KERNEL_HALF_START: u64 = 0xffff_8000_0000_0000;

/// Size of the stack the kernel runs on until the scheduler takes over.
pub const BOOT_STACK_SIZE: usize = 64 * 1024;

/// Size of every task's kernel stack.
#[cfg(debug_assertions)]
pub const TASK_STACK_SIZE: usize = 32 * 1024;

/// Size of every task's kernel stack.
#[cfg(not(debug_assertions))]
pub const TASK_STACK_SIZE: usize = 16 * 1024;

const _: () = {
    assert!(TASK_STACK_SIZE.is_multiple_of(4096));
    assert!(BOOT_STACK_SIZE.is_multiple_of(16));
    assert!(HHDM_BASE >= KERNEL_HALF_START);
    assert!(KERNEL_BASE > HHDM_BASE);
};
