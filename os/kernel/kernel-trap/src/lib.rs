//! # Trap dispatch
//!
//! Every CPU exception and device interrupt funnels through one assembly
//! trampoline into [`Dispatcher::dispatch`]:
//!
//! ```text
//!  vector   0..=31  fault   log one fatal line, halt; never returns
//!  vector   32      timer   scheduler rotates, return the next task's sp
//!  vector   33..    irq     registered handler, or an info line
//!
//!  every returning path: ack at the controller, then on_trap_exit
//! ```
//!
//! The architecture-specific parts (controller acknowledge, CR2/CR3 readout,
//! halting) sit behind [`TrapArch`]; the scheduler sits behind [`Preempt`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod dispatcher;
mod faults;
mod preempt;

pub use dispatcher::{Dispatcher, IrqHandler, Route};
pub use faults::{FAULT_NAMES, fault_name};
pub use preempt::{LockedScheduler, Preempt};

/// First vector past the CPU exception range.
pub const FAULT_VECTORS: u8 = 32;

/// Vector the periodic timer is remapped to (IRQ 0).
pub const TIMER_VECTOR: u8 = 32;

/// First vector available to [`Dispatcher::register`].
pub const FIRST_DEVICE_VECTOR: u8 = TIMER_VECTOR + 1;

/// Hooks into the interrupt controller and the CPU that dispatch needs.
pub trait TrapArch {
    /// Signal end-of-interrupt for `vector` at the controller.
    fn ack(&self, vector: u8);

    /// Faulting linear address (CR2).
    fn fault_address(&self) -> u64;

    /// Active root page-table base (CR3).
    fn page_table_base(&self) -> u64;

    /// Stop the core for good.
    fn halt(&self) -> !;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TrapError {
    #[error("vector {0} is reserved for faults and the timer")]
    ReservedVector(u8),
    #[error("vector {0} already has a handler")]
    AlreadyRegistered(u8),
}
