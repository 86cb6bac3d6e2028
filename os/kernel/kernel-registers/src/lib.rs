//! # Typed `X86_64` Registers
//!
//! The control registers the trap path reads when it reports a fault
//! (`CR2`, `CR3`) and the flags register used to seed new task frames.
//!
//! Register *values* are plain bitfields and can be built and inspected on
//! any host. Actually reading or writing the hardware register needs the
//! `asm` feature and an x86-64 target running at CPL0.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "rflags")]
pub mod rflags;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Writing a control register changes global CPU state.
    unsafe fn store_unsafe(self);
}

pub trait LoadRegister {
    /// Reading this register is permitted at any privilege level.
    fn load() -> Self;
}

impl<T> LoadRegisterUnsafe for T
where
    T: LoadRegister,
{
    #[inline]
    unsafe fn load_unsafe() -> Self {
        <Self as LoadRegister>::load()
    }
}
