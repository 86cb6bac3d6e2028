use crate::Stack;
use core::fmt;

/// Scheduler-assigned task identifier. `0` is the boot context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u32);

impl TaskId {
    pub const IDLE: Self = Self(0);

    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Eligible for selection on the next tick.
    Runnable,
    /// Skipped until unblocked.
    Blocked,
    /// Finished; the stack is released once the task is no longer current.
    Terminated,
}

/// Privilege a task starts in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Privilege {
    Kernel,
    /// Not supported yet; starting such a task fails.
    User,
}

pub struct Task {
    id: TaskId,
    name: &'static str,
    state: TaskState,
    stack: Stack,
}

impl Task {
    pub(crate) const fn new(id: TaskId, name: &'static str, stack: Stack) -> Self {
        Self {
            id,
            name,
            state: TaskState::Runnable,
            stack,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Runnable
    }

    pub(crate) const fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    #[must_use]
    pub const fn stack(&self) -> &Stack {
        &self.stack
    }

    pub const fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("sp", &format_args!("{:#x}", self.stack.load_sp()))
            .finish()
    }
}
