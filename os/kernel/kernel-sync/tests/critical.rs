use kernel_sync::{CpuControl, Critical, InterruptControl};
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Stands in for the IF flag.
#[derive(Default)]
struct IfFlag(AtomicBool);

impl InterruptControl for IfFlag {
    fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn relax(&self) {}
}

fn armed_cpu() -> CpuControl<IfFlag> {
    let cpu = CpuControl::new(IfFlag(AtomicBool::new(true)));
    cpu.arm();
    cpu
}

fn interrupts_on(cpu: &CpuControl<IfFlag>) -> bool {
    cpu.hardware().0.load(Ordering::SeqCst)
}

#[test]
fn lock_masks_interrupts_while_held() {
    let cpu = armed_cpu();
    let cell = Critical::new(0_u32);

    {
        let mut g = cell.lock(&cpu);
        *g = 41;
        assert!(!interrupts_on(&cpu));
        assert_eq!(cpu.depth(), 1);
        assert!(cell.is_locked());
    }

    assert!(interrupts_on(&cpu));
    assert_eq!(cpu.depth(), 0);
    assert!(!cell.is_locked());
    assert_eq!(cell.with_lock(&cpu, |v| *v + 1), 42);
}

#[test]
fn nested_cells_unmask_only_at_the_end() {
    let cpu = armed_cpu();
    let ready = Critical::new(Vec::<u32>::new());
    let ticks = Critical::new(0_u64);

    ready.with_lock(&cpu, |q| {
        ticks.with_lock(&cpu, |t| *t += 1);
        assert!(!interrupts_on(&cpu), "inner unlock must not unmask");
        q.push(1);
    });

    assert!(interrupts_on(&cpu));
}

#[test]
fn try_lock_fails_while_held_and_leaves_depth_balanced() {
    let cpu = armed_cpu();
    let cell = Critical::new(1_u8);

    let g1 = cell.try_lock(&cpu);
    assert!(g1.is_some());

    assert!(cell.try_lock(&cpu).is_none());
    assert_eq!(cpu.depth(), 1);

    drop(g1);
    assert_eq!(cpu.depth(), 0);
    assert!(cell.try_lock(&cpu).is_some());
}

#[test]
fn get_mut_allows_direct_mutation() {
    let cpu = armed_cpu();
    let mut cell = Critical::new(vec![1, 2, 3]);
    cell.get_mut().push(4);
    assert_eq!(cell.lock(&cpu).as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn lock_and_interrupts_are_restored_on_panic() {
    let cpu = armed_cpu();
    let cell = Critical::new(0_u32);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        cell.with_lock(&cpu, |v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");

    assert!(interrupts_on(&cpu));
    assert_eq!(cpu.depth(), 0);
    assert_eq!(cell.with_lock(&cpu, |v| *v), 123);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    use std::sync::{Arc, Barrier};
    use std::thread;

    let threads = 8;
    let iters = 5_000;

    // Disarmed: the spin flag alone provides exclusion between host threads.
    let cpu = Arc::new(CpuControl::new(IfFlag::default()));
    let cell = Arc::new(Critical::new(0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let cpu = Arc::clone(&cpu);
        let cell = Arc::clone(&cell);
        let in_cs = Arc::clone(&in_cs);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..iters {
                cell.with_lock(&cpu, |v| {
                    let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(prev, 0, "mutual exclusion violated");
                    *v += 1;
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                });
                thread::yield_now();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(cell.with_lock(&cpu, |v| *v), threads * iters);
}

#[test]
fn critical_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let cell = Critical::new(0u8);
    takes_sync(&cell);
}
