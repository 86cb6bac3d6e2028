use crate::{CpuControl, InterruptControl};

/// RAII critical section on a [`CpuControl`].
///
/// Construction calls [`CpuControl::enter_critical`]; drop calls
/// [`CpuControl::exit_critical`]. Drop runs on every way out of the owning
/// scope, including `?` propagation and unwinding, so enter/exit stay
/// balanced without caller discipline.
///
/// ```
/// use kernel_sync::{CpuControl, InterruptControl};
///
/// struct NoHw;
/// impl InterruptControl for NoHw {
///     fn enable(&self) {}
///     fn disable(&self) {}
///     fn relax(&self) {}
/// }
///
/// let cpu = CpuControl::new(NoHw);
/// cpu.arm();
/// {
///     let _outer = cpu.guard();
///     let _inner = cpu.guard();
///     assert_eq!(cpu.depth(), 2);
/// }
/// assert_eq!(cpu.depth(), 0);
/// ```
#[must_use = "the critical section ends when the guard is dropped"]
pub struct InterruptGuard<'a, I: InterruptControl> {
    cpu: &'a CpuControl<I>,
}

impl<'a, I: InterruptControl> InterruptGuard<'a, I> {
    #[inline]
    pub fn new(cpu: &'a CpuControl<I>) -> Self {
        cpu.enter_critical();
        Self { cpu }
    }
}

impl<I: InterruptControl> Drop for InterruptGuard<'_, I> {
    #[inline]
    fn drop(&mut self) {
        self.cpu.exit_critical();
    }
}
