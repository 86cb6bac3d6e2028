use crate::{Privilege, SchedError, Stack, Task, TaskArgs, TaskId, TaskState, TrapFrame};
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, info, trace};

/// Single-core round-robin scheduler driven by the timer tick.
///
/// `tasks[0]` is always the idle (boot) task. The others rotate in spawn
/// order; the idle task only runs when none of them is runnable.
pub struct Scheduler {
    tasks: Vec<Task>,
    current: usize,
    next_id: u32,
    ticks: u64,
    stack_size: usize,
}

impl Scheduler {
    /// Bind the running boot context as task 0 and make it current.
    #[must_use]
    pub fn new(stack_size: usize) -> Self {
        Self {
            tasks: vec![Task::new(TaskId::IDLE, "idle", Stack::adopted())],
            current: 0,
            next_id: 1,
            ticks: 0,
            stack_size,
        }
    }

    /// Timer ticks seen so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of tasks, idle included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.len() <= 1
    }

    /// The task bound to this core.
    #[must_use]
    pub fn current(&self) -> &Task {
        &self.tasks[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Task {
        &mut self.tasks[self.current]
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    fn index_of(&self, id: TaskId) -> Result<usize, SchedError> {
        self.tasks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(SchedError::UnknownTask(id))
    }

    /// Seed `task` so that its first resumption enters `ip` on stack `sp`.
    ///
    /// # Errors
    /// [`SchedError::UserModeUnsupported`] for [`Privilege::User`].
    pub fn start(task: &mut Task, ip: u64, sp: u64, args: TaskArgs, privilege: Privilege) -> Result<(), SchedError> {
        if privilege == Privilege::User {
            return Err(SchedError::UserModeUnsupported);
        }
        task.stack_mut().push(TrapFrame::kernel_entry(ip, sp, args));
        Ok(())
    }

    /// Create a task with a fresh stack that starts at `entry`.
    ///
    /// The task becomes runnable immediately and is reached on a later tick.
    ///
    /// # Errors
    /// See [`start`](Self::start).
    pub fn spawn(
        &mut self,
        name: &'static str,
        entry: u64,
        args: TaskArgs,
        privilege: Privilege,
    ) -> Result<TaskId, SchedError> {
        let id = TaskId::new(self.next_id);
        let mut task = Task::new(id, name, Stack::new(self.stack_size));
        // Entry sees rsp ≡ 8 (mod 16), as after a call. Tasks never return.
        let sp = task.stack().top() - 8;
        Self::start(&mut task, entry, sp, args, privilege)?;

        self.next_id += 1;
        self.tasks.push(task);
        info!("sched: spawned {name} as task {id}");
        Ok(id)
    }

    /// Round-robin selection: the first runnable task after the current one,
    /// wrapping around. The idle task is skipped unless nothing else is
    /// runnable. The chosen task becomes current.
    pub fn pick_next(&mut self) -> TaskId {
        let n = self.tasks.len();
        let next = (1..=n)
            .map(|step| (self.current + step) % n)
            .find(|&i| i != 0 && self.tasks[i].is_runnable())
            .unwrap_or(0);

        if next != self.current {
            trace!(
                "sched: switch {} -> {}",
                self.tasks[self.current].id(),
                self.tasks[next].id()
            );
        }
        self.current = next;
        self.tasks[next].id()
    }

    /// Timer tick: save the preempted `sp`, pick the next task, return the
    /// stack pointer to resume.
    pub fn on_tick(&mut self, sp: u64) -> u64 {
        self.ticks += 1;
        self.current_mut().stack_mut().save_sp(sp);
        self.reap();
        self.pick_next();
        self.current().stack().load_sp()
    }

    /// Release terminated tasks other than the current one.
    fn reap(&mut self) {
        let current = self.tasks[self.current].id();
        let before = self.tasks.len();
        self.tasks
            .retain(|t| t.state() != TaskState::Terminated || t.id() == current);
        if self.tasks.len() != before {
            debug!("sched: reaped {} task(s)", before - self.tasks.len());
            self.current = self
                .tasks
                .iter()
                .position(|t| t.id() == current)
                .unwrap_or(0);
        }
    }

    fn set_state(&mut self, id: TaskId, state: TaskState) -> Result<(), SchedError> {
        if id == TaskId::IDLE {
            return Err(SchedError::IdleTask);
        }
        let i = self.index_of(id)?;
        self.tasks[i].set_state(state);
        Ok(())
    }

    /// Keep `id` from being picked until [`unblock`](Self::unblock).
    ///
    /// # Errors
    /// Unknown task or the idle task.
    pub fn block(&mut self, id: TaskId) -> Result<(), SchedError> {
        self.set_state(id, TaskState::Blocked)
    }

    /// # Errors
    /// Unknown task or the idle task.
    pub fn unblock(&mut self, id: TaskId) -> Result<(), SchedError> {
        self.set_state(id, TaskState::Runnable)
    }

    /// Mark `id` finished. Its stack is released on a later tick, once
    /// execution has moved off it.
    ///
    /// # Errors
    /// Unknown task or the idle task.
    pub fn terminate(&mut self, id: TaskId) -> Result<(), SchedError> {
        self.set_state(id, TaskState::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_current_at_start() {
        let s = Scheduler::new(4096);
        assert_eq!(s.current().id(), TaskId::IDLE);
        assert!(s.is_empty());
    }

    #[test]
    fn spawn_seeds_an_entry_frame() {
        let mut s = Scheduler::new(4096);
        let id = s.spawn("worker", 0x4000, [9, 8, 7, 6, 5], Privilege::Kernel).unwrap();
        let task = s.task(id).unwrap();
        let frame = task.stack().frame_at_sp().unwrap();
        assert_eq!(frame.rip, 0x4000);
        assert_eq!(frame.rsp, task.stack().top() - 8);
        assert_eq!(frame.r8, 5);
    }

    #[test]
    fn user_privilege_is_rejected() {
        let mut s = Scheduler::new(4096);
        assert_eq!(
            s.spawn("user", 0x4000, [0; 5], Privilege::User),
            Err(SchedError::UserModeUnsupported)
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn idle_cannot_be_blocked() {
        let mut s = Scheduler::new(4096);
        assert_eq!(s.block(TaskId::IDLE), Err(SchedError::IdleTask));
        assert_eq!(
            s.terminate(TaskId::new(42)),
            Err(SchedError::UnknownTask(TaskId::new(42)))
        );
    }
}
