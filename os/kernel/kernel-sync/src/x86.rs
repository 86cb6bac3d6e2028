//! `cli`/`sti`/`hlt` on x86-64.
//!
//! These instructions fault outside ring 0; the kernel is the only caller.

use crate::InterruptControl;

/// Clear IF: mask maskable interrupts.
#[inline]
pub fn cli_stop_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Set IF: unmask maskable interrupts.
#[inline]
pub fn sti_enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Wait for the next interrupt.
#[inline]
pub fn hlt() {
    unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) }
}

/// The x86-64 [`InterruptControl`].
#[derive(Copy, Clone, Debug, Default)]
pub struct X86Interrupts;

impl InterruptControl for X86Interrupts {
    #[inline]
    fn enable(&self) {
        sti_enable_interrupts();
    }

    #[inline]
    fn disable(&self) {
        cli_stop_interrupts();
    }

    #[inline]
    fn relax(&self) {
        hlt();
    }
}
