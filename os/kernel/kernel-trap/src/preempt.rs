use kernel_sched::Scheduler;
use kernel_sync::{CpuControl, Critical, InterruptControl};
use log::trace;

/// What the timer vector hands the preempted stack pointer to.
pub trait Preempt {
    /// Save `sp` for the current task and return the sp to resume.
    fn preempt(&mut self, sp: u64) -> u64;
}

impl Preempt for Scheduler {
    fn preempt(&mut self, sp: u64) -> u64 {
        self.on_tick(sp)
    }
}

/// Scheduling not started yet: keep running the interrupted context.
impl<T: Preempt> Preempt for Option<T> {
    fn preempt(&mut self, sp: u64) -> u64 {
        self.as_mut().map_or(sp, |inner| inner.preempt(sp))
    }
}

/// A scheduler shared with normal code through a [`Critical`] cell.
///
/// The timer never waits for the cell: if the interrupted code holds it, the
/// tick is skipped and the interrupted context resumes.
pub struct LockedScheduler<'a, T, I: InterruptControl> {
    cell: &'a Critical<T>,
    cpu: &'a CpuControl<I>,
}

impl<'a, T, I: InterruptControl> LockedScheduler<'a, T, I> {
    pub const fn new(cell: &'a Critical<T>, cpu: &'a CpuControl<I>) -> Self {
        Self { cell, cpu }
    }
}

impl<T: Preempt, I: InterruptControl> Preempt for LockedScheduler<'_, T, I> {
    fn preempt(&mut self, sp: u64) -> u64 {
        match self.cell.try_lock(self.cpu) {
            Some(mut sched) => sched.preempt(sp),
            None => {
                trace!("tick skipped: scheduler busy");
                sp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offset(u64);

    impl Preempt for Offset {
        fn preempt(&mut self, sp: u64) -> u64 {
            sp + self.0
        }
    }

    struct NoHw;

    impl InterruptControl for NoHw {
        fn enable(&self) {}
        fn disable(&self) {}
        fn relax(&self) {}
    }

    #[test]
    fn none_keeps_the_interrupted_sp() {
        let mut sched: Option<Offset> = None;
        assert_eq!(sched.preempt(0x1000), 0x1000);
        let mut sched = Some(Offset(0x10));
        assert_eq!(sched.preempt(0x1000), 0x1010);
    }

    #[test]
    fn busy_cell_skips_the_tick() {
        let cpu = CpuControl::new(NoHw);
        let cell = Critical::new(Offset(0x10));
        let mut locked = LockedScheduler::new(&cell, &cpu);
        assert_eq!(locked.preempt(0x1000), 0x1010);

        let _held = cell.lock(&cpu);
        assert_eq!(locked.preempt(0x1000), 0x1000);
    }
}
