//! # Kernel Configuration and Boot Interface
//!
//! Compile-time constants shared by the kernel and its crates, plus the
//! loader-to-kernel handoff structure.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`boot`] | Kernel entry signature and [`KernelBootInfo`](boot::KernelBootInfo) |
//! | [`memory`] | Virtual layout, physical load address, stack sizes |
//! | [`segments`] | GDT slots and the selectors new tasks start with |
//! | [`timer`] | Scheduler tick rate and PIT input clock |
//! | [`logging`] | Default log level |
//!
//! ## Virtual Memory Layout
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │  User half (per address space)  │  PML4 slots 0..256
//! 0x0000_7FFF_FFFF_FFFF ├─────────────────────────────────┤
//!                       │  non-canonical hole             │
//! 0xFFFF_8000_0000_0000 ├─────────────────────────────────┤
//!                       │  Kernel half (shared)           │  PML4 slots 256..512
//! HHDM_BASE             ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │  Higher Half Direct Map         │
//! KERNEL_BASE           ├─────────────────────────────────┤ 0xffff_ffff_8000_0000
//!                       │  Kernel text & data             │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! The constants are also consumed by the kernel's `build.rs`:
//!
//! ```rust
//! use kernel_info::memory::{KERNEL_BASE, PHYS_LOAD};
//!
//! println!("cargo:rustc-link-arg=--defsym=KERNEL_BASE={:#x}", KERNEL_BASE);
//! println!("cargo:rustc-link-arg=--defsym=PHYS_LOAD={:#x}", PHYS_LOAD);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod logging;
pub mod memory;
pub mod segments;
pub mod timer;
