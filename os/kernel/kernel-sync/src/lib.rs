//! # CPU control and interrupt-masking primitives
//!
//! The kernel has exactly one way to keep interrupts away from a piece of
//! code: the nesting-aware [`CpuControl`] and its scoped [`InterruptGuard`].
//!
//! ```text
//!  normal code            enter   enter   exit   exit
//!  depth            0 ──► 1 ────► 2 ────► 1 ───► 0
//!  interrupts       on    off     off     off    on   (only the outermost exit unmasks)
//!
//!  trap entry       on_trap_enter: disarm (hardware already masked)
//!  handler code     enter/exit are no-ops while disarmed
//!  trap exit        on_trap_exit: restore the pre-trap armed flag
//! ```
//!
//! The hardware side ([`InterruptControl`]) is a trait with one concrete
//! implementation per architecture ([`X86Interrupts`] on x86-64), chosen at
//! build time. Tests substitute a recording implementation.
//!
//! [`Critical`] pairs the guard with a spin flag to protect data shared
//! between normal code and trap handlers, and [`BootOnce`] holds tables that
//! are written once during bootstrap and only read afterwards.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod boot_once;
mod cpu;
mod critical;
mod guard;
#[cfg(target_arch = "x86_64")]
pub mod x86;

pub use boot_once::BootOnce;
pub use cpu::{CpuControl, CpuState, InterruptControl, TrapEntry};
pub use critical::{Critical, CriticalGuard};
pub use guard::InterruptGuard;
#[cfg(target_arch = "x86_64")]
pub use x86::X86Interrupts;
