//! # Tasks and Round-Robin Scheduling
//!
//! Every task owns a kernel stack. A context switch is nothing but a stack
//! pointer swap inside the timer trap:
//!
//! ```text
//!  task A running ──► timer trap: trampoline pushes A's TrapFrame on A's stack
//!                     Scheduler::on_tick(sp_A):
//!                       A.stack.save_sp(sp_A)
//!                       pick_next() → B
//!                       return B.stack.load_sp()
//!                     trampoline pops B's TrapFrame, iretq ──► task B running
//! ```
//!
//! A new task gets a synthetic [`TrapFrame`] pushed onto its fresh stack, so
//! its first resumption looks exactly like resuming a preempted task.
//!
//! Task 0 is the boot context. It is bound as current when the scheduler is
//! created and is only picked when nothing else is runnable.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod frame;
mod scheduler;
mod stack;
mod task;

pub use frame::{TaskArgs, TrapFrame};
pub use scheduler::Scheduler;
pub use stack::Stack;
pub use task::{Privilege, Task, TaskId, TaskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    #[error("user-mode task entry is not supported")]
    UserModeUnsupported,
    #[error("no task with id {0}")]
    UnknownTask(TaskId),
    #[error("the idle task cannot be blocked or terminated")]
    IdleTask,
}
