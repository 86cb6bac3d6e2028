use crate::{FAULT_VECTORS, FIRST_DEVICE_VECTOR, Preempt, TIMER_VECTOR, TrapArch, TrapError, fault_name};
use kernel_info::logging::TRAP_TARGET;
use kernel_sched::TrapFrame;
use kernel_sync::{CpuControl, InterruptControl};
use log::{error, info, trace};

/// Handler for a device vector; runs with interrupts masked.
pub type IrqHandler = fn(&TrapFrame);

/// Where a vector goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Fault(&'static str),
    Timer,
    Irq(u8),
}

impl Route {
    /// Classify a vector as delivered in the trap frame.
    #[must_use]
    pub fn of(vector: u64) -> Self {
        match fault_name(vector) {
            Some(name) => Self::Fault(name),
            None if vector == u64::from(TIMER_VECTOR) => Self::Timer,
            // The trampolines only push 0..=255.
            None => Self::Irq(u8::try_from(vector).unwrap_or(u8::MAX)),
        }
    }
}

/// Routes traps to fault reporting, the scheduler, or device handlers.
pub struct Dispatcher<A: TrapArch> {
    arch: A,
    handlers: [Option<IrqHandler>; 256],
}

impl<A: TrapArch> Dispatcher<A> {
    pub const fn new(arch: A) -> Self {
        Self {
            arch,
            handlers: [None; 256],
        }
    }

    pub const fn arch(&self) -> &A {
        &self.arch
    }

    /// Install `handler` for device vector `vector`.
    ///
    /// # Errors
    /// Vectors below [`FIRST_DEVICE_VECTOR`] belong to faults and the timer;
    /// a vector takes at most one handler.
    pub fn register(&mut self, vector: u8, handler: IrqHandler) -> Result<(), TrapError> {
        if vector < FIRST_DEVICE_VECTOR {
            return Err(TrapError::ReservedVector(vector));
        }
        let slot = &mut self.handlers[usize::from(vector)];
        if slot.is_some() {
            return Err(TrapError::AlreadyRegistered(vector));
        }
        *slot = Some(handler);
        Ok(())
    }

    /// Entry point for the trampoline.
    ///
    /// Returns the stack pointer to resume from: `sp` itself unless the timer
    /// switched tasks.
    ///
    /// # Safety
    /// `sp` must point at the [`TrapFrame`] the trampoline just pushed, and
    /// hardware interrupts must be masked.
    pub unsafe fn dispatch<I, P>(&self, cpu: &CpuControl<I>, sched: &mut P, sp: u64) -> u64
    where
        I: InterruptControl,
        P: Preempt + ?Sized,
    {
        // SAFETY: guaranteed by the caller.
        let frame = unsafe { &*(sp as *const TrapFrame) };
        self.route(cpu, sched, frame, sp)
    }

    /// [`dispatch`](Self::dispatch) for a frame already borrowed.
    pub fn route<I, P>(&self, cpu: &CpuControl<I>, sched: &mut P, frame: &TrapFrame, sp: u64) -> u64
    where
        I: InterruptControl,
        P: Preempt + ?Sized,
    {
        let entry = cpu.on_trap_enter();

        let vector = frame.vector;
        let resume = match Route::of(vector) {
            Route::Fault(name) => self.fatal(name, frame),
            Route::Timer => sched.preempt(sp),
            Route::Irq(v) => {
                match self.handlers[usize::from(v)] {
                    Some(handler) => handler(frame),
                    None => info!(target: TRAP_TARGET, "irq: {}", v - FAULT_VECTORS),
                }
                sp
            }
        };

        // Only vectors past the exception range reach this point.
        self.arch.ack(u8::try_from(vector).unwrap_or(u8::MAX));
        cpu.on_trap_exit(entry);

        if resume != sp {
            trace!(target: TRAP_TARGET, "resume sp {resume:#x}");
        }
        resume
    }

    fn fatal(&self, name: &str, frame: &TrapFrame) -> ! {
        error!(
            target: TRAP_TARGET,
            "cpu exception: {name} (err={:#x}, ip={:#x}, sp={:#x}, cr2={:#x}, cr3={:#x})",
            frame.error_code,
            frame.rip,
            frame.rsp,
            self.arch.fault_address(),
            self.arch.page_table_base(),
        );
        self.arch.halt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_route_by_range() {
        assert_eq!(Route::of(0), Route::Fault("division-by-zero"));
        assert_eq!(Route::of(31), Route::Fault("reserved"));
        assert_eq!(Route::of(32), Route::Timer);
        assert_eq!(Route::of(33), Route::Irq(33));
        assert_eq!(Route::of(255), Route::Irq(255));
    }
}
