use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, Ordering};

/// Nothing installed; the first writer may claim the slot.
const VACANT: u8 = 0;
/// A writer owns the slot and is moving the value in.
const CLAIMED: u8 = 1;
/// The value is in place and never changes again.
const INSTALLED: u8 = 2;

/// A value installed once during bootstrap and read-only afterwards.
///
/// Descriptor tables, the kernel root table and the trap dispatcher live in
/// cells like this one. Bootstrap claims the slot, moves the value in and
/// publishes it; trap handlers only ever read.
///
/// ```text
///  VACANT ──claim──► CLAIMED ──publish──► INSTALLED
///    │                                       ▲
///    └── set / get_or_init after INSTALLED ──┘ (rejected / returns existing)
/// ```
///
/// There is no way back to `VACANT`: an installed value lives as long as the
/// cell.
pub struct BootOnce<T> {
    state: AtomicU8,
    slot: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for BootOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BootOnce<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(VACANT),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// The installed value, or `None` during bootstrap.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        (self.state.load(Ordering::Acquire) == INSTALLED).then(|| {
            // SAFETY: INSTALLED is stored only after the slot was written.
            unsafe { self.installed() }
        })
    }

    /// Install `value`.
    ///
    /// # Errors
    /// Hands `value` back if the cell was claimed before.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if self.claim() {
            Ok(self.publish(value))
        } else {
            Err(value)
        }
    }

    /// The installed value; builds and installs it with `init` if the cell
    /// is still vacant.
    ///
    /// A caller that loses the claim to a concurrent writer spins until that
    /// writer publishes.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(value) = self.get() {
            return value;
        }
        if self.claim() {
            return self.publish(init());
        }

        while self.state.load(Ordering::Acquire) != INSTALLED {
            spin_loop();
        }
        // SAFETY: observed INSTALLED with acquire ordering.
        unsafe { self.installed() }
    }

    fn claim(&self) -> bool {
        self.state
            .compare_exchange(VACANT, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Only the claiming writer calls this, exactly once.
    fn publish(&self, value: T) -> &T {
        // SAFETY: CLAIMED excludes every other writer and no reader looks at
        // the slot before INSTALLED.
        unsafe { (*self.slot.get()).write(value) };
        self.state.store(INSTALLED, Ordering::Release);
        // SAFETY: written above.
        unsafe { self.installed() }
    }

    /// # Safety
    /// The state must be `INSTALLED`.
    unsafe fn installed(&self) -> &T {
        unsafe { (*self.slot.get()).assume_init_ref() }
    }
}

impl<T> Drop for BootOnce<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == INSTALLED {
            // SAFETY: INSTALLED means the slot holds a value.
            unsafe { self.slot.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: readers only get `&T` after INSTALLED; the single writer moves a
// `T` in from its own thread.
unsafe impl<T: Sync + Send> Sync for BootOnce<T> {}
unsafe impl<T: Send> Send for BootOnce<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn second_set_is_rejected() {
        let cell = BootOnce::new();
        assert!(cell.get().is_none());
        assert_eq!(cell.set(7_u32), Ok(&7));
        assert_eq!(cell.set(8), Err(8));
        assert_eq!(cell.get(), Some(&7));
    }

    #[test]
    fn get_or_init_runs_once() {
        let cell = BootOnce::new();
        let mut calls = 0;
        cell.get_or_init(|| {
            calls += 1;
            String::from("gdt")
        });
        let v = cell.get_or_init(|| String::from("other"));
        assert_eq!(v, "gdt");
        assert_eq!(calls, 1);
        assert_eq!(cell.set(String::from("late")), Err(String::from("late")));
    }

    #[test]
    fn installed_value_is_dropped_with_the_cell() {
        let value = Rc::new(());
        let cell = BootOnce::new();
        assert!(cell.set(Rc::clone(&value)).is_ok());
        assert_eq!(Rc::strong_count(&value), 2);
        drop(cell);
        assert_eq!(Rc::strong_count(&value), 1);
    }

    #[test]
    fn racing_writers_install_exactly_one_value() {
        let cell = Arc::new(BootOnce::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8_usize)
            .map(|i| {
                let cell = Arc::clone(&cell);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if cell.set(i).is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    *cell.get_or_init(|| usize::MAX)
                })
            })
            .collect();

        let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        let installed = *cell.get().unwrap();
        assert!(installed < 8);
        assert!(seen.iter().all(|&v| v == installed));
    }
}
