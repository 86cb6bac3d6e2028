//! Round-robin behavior of [`Scheduler::on_tick`].

use kernel_sched::{Privilege, Scheduler, TaskId};
use std::collections::HashSet;

const STACK: usize = 8 * 1024;
const BOOT_SP: u64 = 0x7fff_0000;

fn spawn_n(s: &mut Scheduler, n: usize) -> Vec<TaskId> {
    (0..n)
        .map(|i| {
            s.spawn("worker", 0x1000 + i as u64, [i as u64, 0, 0, 0, 0], Privilege::Kernel)
                .unwrap()
        })
        .collect()
}

/// Simulate one tick as the trampoline would: the interrupted task's saved
/// pointer goes in, the resumed task's pointer comes out.
fn tick(s: &mut Scheduler) -> TaskId {
    let sp = if s.current().id() == TaskId::IDLE {
        BOOT_SP
    } else {
        s.current().stack().load_sp()
    };
    let resumed = s.on_tick(sp);
    assert_eq!(resumed, s.current().stack().load_sp());
    s.current().id()
}

#[test]
fn k_ticks_visit_each_of_k_tasks_once() {
    for k in 1..=6 {
        let mut s = Scheduler::new(STACK);
        let ids = spawn_n(&mut s, k);
        // Leave the boot context first.
        tick(&mut s);

        let seen: Vec<TaskId> = (0..k).map(|_| tick(&mut s)).collect();
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), k, "k={k}: {seen:?}");
        assert!(seen.iter().all(|id| ids.contains(id)));
    }
}

#[test]
fn rotation_follows_spawn_order() {
    let mut s = Scheduler::new(STACK);
    let ids = spawn_n(&mut s, 3);
    let order: Vec<TaskId> = (0..6).map(|_| tick(&mut s)).collect();
    assert_eq!(order, [ids[0], ids[1], ids[2], ids[0], ids[1], ids[2]]);
    assert_eq!(s.ticks(), 6);
}

#[test]
fn blocked_tasks_are_skipped() {
    let mut s = Scheduler::new(STACK);
    let ids = spawn_n(&mut s, 3);
    s.block(ids[1]).unwrap();

    let order: Vec<TaskId> = (0..4).map(|_| tick(&mut s)).collect();
    assert_eq!(order, [ids[0], ids[2], ids[0], ids[2]]);

    // The cursor sits on C, so the rotation wraps to A before reaching B.
    s.unblock(ids[1]).unwrap();
    assert_eq!(tick(&mut s), ids[0]);
    assert_eq!(tick(&mut s), ids[1]);
}

#[test]
fn idle_runs_only_when_nothing_else_can() {
    let mut s = Scheduler::new(STACK);
    assert_eq!(tick(&mut s), TaskId::IDLE);
    assert_eq!(s.on_tick(BOOT_SP), BOOT_SP);

    let ids = spawn_n(&mut s, 1);
    assert_eq!(tick(&mut s), ids[0]);
    assert_eq!(tick(&mut s), ids[0]);

    s.block(ids[0]).unwrap();
    assert_eq!(tick(&mut s), TaskId::IDLE);
    assert_eq!(s.current().stack().load_sp(), BOOT_SP);
}

#[test]
fn first_resumption_lands_on_the_seeded_frame() {
    let mut s = Scheduler::new(STACK);
    let ids = spawn_n(&mut s, 2);

    tick(&mut s);
    let frame = s.current().stack().frame_at_sp().unwrap();
    assert_eq!(s.current().id(), ids[0]);
    assert_eq!(frame.rip, 0x1000);
    assert_eq!(frame.rdi, 0);
    assert_eq!(frame.rflags, 0x202);

    tick(&mut s);
    let frame = s.current().stack().frame_at_sp().unwrap();
    assert_eq!(frame.rip, 0x1001);
    assert_eq!(frame.rdi, 1);
}

#[test]
fn terminated_tasks_are_reaped_after_switching_away() {
    let mut s = Scheduler::new(STACK);
    let ids = spawn_n(&mut s, 2);
    assert_eq!(tick(&mut s), ids[0]);

    s.terminate(ids[0]).unwrap();
    assert_eq!(s.len(), 3);
    assert_eq!(tick(&mut s), ids[1]);
    assert_eq!(tick(&mut s), ids[1]);
    assert!(s.task(ids[0]).is_none());
    assert_eq!(s.len(), 2);
}

#[test]
fn user_mode_spawn_fails_without_consuming_an_id() {
    let mut s = Scheduler::new(STACK);
    assert!(s.spawn("user", 0x1000, [0; 5], Privilege::User).is_err());
    let id = s.spawn("kernel", 0x1000, [0; 5], Privilege::Kernel).unwrap();
    assert_eq!(id, TaskId::new(1));
}
