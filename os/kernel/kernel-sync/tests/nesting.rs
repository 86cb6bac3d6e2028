//! Nesting behavior of [`CpuControl`] observed through a recording backend.

use kernel_sync::{CpuControl, CpuState, InterruptControl};
use std::sync::Mutex;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Op {
    Enable,
    Disable,
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Op>>);

impl Recorder {
    fn ops(&self) -> Vec<Op> {
        self.0.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl InterruptControl for Recorder {
    fn enable(&self) {
        self.0.lock().unwrap().push(Op::Enable);
    }

    fn disable(&self) {
        self.0.lock().unwrap().push(Op::Disable);
    }

    fn relax(&self) {}
}

fn armed() -> CpuControl<Recorder> {
    let cpu = CpuControl::new(Recorder::default());
    cpu.arm();
    cpu
}

#[test]
fn balanced_sequences_enable_exactly_once_at_the_end() {
    for n in 1..=8 {
        let cpu = armed();
        for _ in 0..n {
            cpu.enter_critical();
        }
        for i in (0..n).rev() {
            cpu.exit_critical();
            assert_eq!(cpu.depth(), i);
        }

        let ops = cpu.hardware().ops();
        let enables = ops.iter().filter(|op| **op == Op::Enable).count();
        assert_eq!(enables, 1, "n={n}");
        assert_eq!(ops.last(), Some(&Op::Enable));
        assert_eq!(cpu.state(), CpuState { armed: true, depth: 0 });
    }
}

#[test]
fn interleaved_guards_keep_depth_in_step() {
    let cpu = armed();
    {
        let _a = cpu.guard();
        {
            let _b = cpu.guard();
            let _c = cpu.guard();
            assert_eq!(cpu.depth(), 3);
        }
        assert_eq!(cpu.depth(), 1);
        assert!(!cpu.hardware().ops().contains(&Op::Enable));
    }
    assert_eq!(cpu.depth(), 0);
    assert_eq!(cpu.hardware().ops().last(), Some(&Op::Enable));
}

#[test]
fn guard_closes_on_early_return() {
    fn fallible(cpu: &CpuControl<Recorder>, fail: bool) -> Result<u32, &'static str> {
        let _g = cpu.guard();
        if fail {
            return Err("bail");
        }
        Ok(1)
    }

    let cpu = armed();
    assert!(fallible(&cpu, true).is_err());
    assert_eq!(cpu.depth(), 0);
    assert_eq!(fallible(&cpu, false), Ok(1));
    assert_eq!(cpu.depth(), 0);
}

#[test]
fn with_critical_returns_the_closure_value() {
    let cpu = armed();
    let v = cpu.with_critical(|| cpu.depth() * 10);
    assert_eq!(v, 10);
    assert_eq!(cpu.depth(), 0);
}

#[test]
fn trap_bracket_suspends_tracking_and_restores_state() {
    let cpu = armed();
    cpu.enter_critical();
    cpu.hardware().clear();

    let entry = cpu.on_trap_enter();
    assert!(!cpu.is_armed());
    {
        // Handler code: no-ops while disarmed.
        let _g = cpu.guard();
        cpu.enter_critical();
        cpu.exit_critical();
        assert_eq!(cpu.depth(), 1);
    }
    cpu.on_trap_exit(entry);

    assert_eq!(cpu.state(), CpuState { armed: true, depth: 1 });
    assert!(cpu.hardware().ops().is_empty());

    cpu.exit_critical();
    assert_eq!(cpu.hardware().ops(), vec![Op::Enable]);
}

#[test]
fn nested_traps_unwind_to_the_outer_state() {
    let cpu = armed();
    let outer = cpu.on_trap_enter();
    let inner = cpu.on_trap_enter();
    cpu.on_trap_exit(inner);
    assert!(!cpu.is_armed());
    cpu.on_trap_exit(outer);
    assert!(cpu.is_armed());
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "exit_critical without matching enter_critical")]
fn unbalanced_exit_is_caught_in_debug_builds() {
    let cpu = armed();
    cpu.exit_critical();
}
