use crate::{CpuControl, InterruptControl, InterruptGuard};
use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// Data shared between normal kernel code and trap handlers.
///
/// Locking first opens a critical section on the given [`CpuControl`] and
/// then takes a test-and-test-and-set spin flag. On a single core the
/// masked interrupts already exclude the trap handlers; the flag catches
/// reentrant use from inside a handler (where the control is disarmed)
/// and keeps the type honest about `Sync`.
pub struct Critical<T> {
    /// lock state
    /// * `false`: free
    /// * `true`: held
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: mutual exclusion; only T: Send may cross threads.
unsafe impl<T: Send> Sync for Critical<T> {}

impl<T> Critical<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Try once; the critical section is closed again if the flag is taken.
    #[inline]
    pub fn try_lock<'a, I: InterruptControl>(
        &'a self,
        cpu: &'a CpuControl<I>,
    ) -> Option<CriticalGuard<'a, T, I>> {
        let irq = cpu.guard();
        if self.try_acquire() {
            Some(CriticalGuard { _irq: irq, cell: self })
        } else {
            None
        }
    }

    /// Mask interrupts, then spin (TATAS) until the flag is ours.
    #[inline]
    pub fn lock<'a, I: InterruptControl>(&'a self, cpu: &'a CpuControl<I>) -> CriticalGuard<'a, T, I> {
        let irq = cpu.guard();
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
        CriticalGuard { _irq: irq, cell: self }
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<I: InterruptControl, R>(
        &self,
        cpu: &CpuControl<I>,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut g = self.lock(cpu);
        f(&mut g)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Whether the spin flag is currently taken.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Access to the contents of a [`Critical`].
///
/// Dropping releases the spin flag first and closes the critical section
/// afterwards, so interrupts are never unmasked while the flag is held.
#[must_use = "the lock is released when the guard is dropped"]
pub struct CriticalGuard<'a, T, I: InterruptControl> {
    _irq: InterruptGuard<'a, I>,
    cell: &'a Critical<T>,
}

impl<T, I: InterruptControl> Deref for CriticalGuard<'_, T, I> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.cell.inner.get() }
    }
}

impl<T, I: InterruptControl> DerefMut for CriticalGuard<'_, T, I> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.cell.inner.get() }
    }
}

impl<T, I: InterruptControl> Drop for CriticalGuard<'_, T, I> {
    fn drop(&mut self) {
        // Runs before `_irq` is dropped.
        self.cell.locked.store(false, Ordering::Release);
    }
}
