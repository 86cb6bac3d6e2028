use crate::InterruptGuard;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use log::trace;

/// Hardware interrupt control for one architecture.
///
/// Implementations talk to the CPU directly and keep no state of their own;
/// all nesting bookkeeping lives in [`CpuControl`].
pub trait InterruptControl {
    /// Unmask maskable interrupts (`sti` on x86-64).
    fn enable(&self);

    /// Mask maskable interrupts (`cli` on x86-64).
    fn disable(&self);

    /// Wait for the next interrupt (`hlt` on x86-64).
    fn relax(&self);

    /// Mask interrupts and stop this core for good.
    fn halt_forever(&self) -> ! {
        loop {
            self.disable();
            self.relax();
        }
    }
}

/// Snapshot of the nesting bookkeeping of one core.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CpuState {
    /// Whether [`CpuControl::enter_critical`] / [`CpuControl::exit_critical`]
    /// are currently tracked.
    pub armed: bool,
    /// Number of open critical sections.
    pub depth: usize,
}

/// Returned by [`CpuControl::on_trap_enter`]; hand it back to
/// [`CpuControl::on_trap_exit`] when leaving the trap.
#[must_use = "pass the entry token back to on_trap_exit"]
#[derive(Debug)]
pub struct TrapEntry {
    was_armed: bool,
}

/// Per-core, reentrant interrupt masking.
///
/// While **armed**, [`enter_critical`](Self::enter_critical) masks interrupts
/// and increments the depth; [`exit_critical`](Self::exit_critical)
/// decrements it and unmasks only when the depth returns to exactly `0`.
/// While **disarmed**, both calls are no-ops.
///
/// ### Invariant
/// When armed and `depth == 0`, interrupts are enabled in hardware.
///
/// Unbalanced manual calls are a programming error. Debug builds assert on
/// an exit without a matching enter; release builds do not check. Prefer
/// [`guard`](Self::guard), which balances structurally.
pub struct CpuControl<I: InterruptControl> {
    hw: I,
    armed: AtomicBool,
    depth: AtomicUsize,
}

impl<I: InterruptControl> CpuControl<I> {
    /// A disarmed control with depth `0`. Nothing is tracked until
    /// [`arm`](Self::arm) is called at the end of bootstrap.
    pub const fn new(hw: I) -> Self {
        Self {
            hw,
            armed: AtomicBool::new(false),
            depth: AtomicUsize::new(0),
        }
    }

    /// The underlying hardware control.
    #[inline]
    pub const fn hardware(&self) -> &I {
        &self.hw
    }

    /// Start tracking critical sections.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop tracking critical sections. The depth is left untouched.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    #[inline]
    pub fn state(&self) -> CpuState {
        CpuState {
            armed: self.is_armed(),
            depth: self.depth(),
        }
    }

    /// Open a critical section: mask interrupts and bump the depth.
    pub fn enter_critical(&self) {
        if !self.is_armed() {
            return;
        }

        self.hw.disable();
        self.depth.fetch_add(1, Ordering::AcqRel);
    }

    /// Close a critical section. Unmasks interrupts when the outermost
    /// section closes.
    pub fn exit_critical(&self) {
        if !self.is_armed() {
            return;
        }

        let previous = self.depth.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "exit_critical without matching enter_critical");
        if previous == 1 {
            self.hw.enable();
        }
    }

    /// Scoped critical section; closed when the guard drops.
    #[inline]
    pub fn guard(&self) -> InterruptGuard<'_, I> {
        InterruptGuard::new(self)
    }

    /// Run `f` inside a critical section.
    #[inline]
    pub fn with_critical<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.guard();
        f()
    }

    /// Bracket the start of a hardware-invoked trap.
    ///
    /// The CPU masked interrupts on entry. Tracking is disarmed so that
    /// critical sections taken inside the handler leave the depth of the
    /// interrupted code alone.
    pub fn on_trap_enter(&self) -> TrapEntry {
        let was_armed = self.armed.swap(false, Ordering::AcqRel);
        trace!("trap enter (armed={was_armed}, depth={})", self.depth());
        TrapEntry { was_armed }
    }

    /// Bracket the end of a trap; restores the armed flag seen on entry.
    pub fn on_trap_exit(&self, entry: TrapEntry) {
        self.armed.store(entry.was_armed, Ordering::Release);
    }

    /// Mask interrupts and halt this core.
    pub fn halt(&self) -> ! {
        self.hw.halt_forever()
    }

    /// Wait for the next interrupt.
    #[inline]
    pub fn relax(&self) {
        self.hw.relax();
    }
}
