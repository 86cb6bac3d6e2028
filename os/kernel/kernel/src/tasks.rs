//! Demo workloads started at boot.

use crate::{CPU, SCHED};
use log::{info, warn};

/// Wake on every interrupt; report every `period` wakeups.
pub extern "C" fn ticker(id: u64, period: u64) -> ! {
    let period = period.max(1);
    let mut wakeups = 0u64;
    loop {
        CPU.relax();
        wakeups += 1;
        if wakeups.is_multiple_of(period) {
            let ticks = SCHED.with_lock(&CPU, |s| s.as_ref().map_or(0, kernel_sched::Scheduler::ticks));
            info!("ticker {id}: {wakeups} wakeups, {ticks} ticks");
        }
    }
}

/// Say hello once, then retire.
pub extern "C" fn one_shot(id: u64) -> ! {
    info!("one-shot {id}: running, retiring");

    let retired = SCHED.with_lock(&CPU, |s| {
        let sched = s.as_mut()?;
        let me = sched.current().id();
        Some(sched.terminate(me))
    });
    if let Some(Err(e)) = retired {
        warn!("one-shot {id}: {e}");
    }

    // Runs until the next tick moves off this stack for good.
    loop {
        CPU.relax();
    }
}
