//! # 8253/8254 programmable interval timer, channel 0
//!
//! Channel 0 drives IRQ 0. In rate-generator mode it fires every `divisor`
//! input clocks, i.e. at `PIT_BASE_HZ / divisor`.

use crate::ports::outb;
use kernel_info::timer::{PIT_BASE_HZ, pit_divisor};
use log::info;

const CHANNEL0_DATA: u16 = 0x40;
const MODE_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 2 (rate generator), binary.
const CHANNEL0_RATE_GENERATOR: u8 = 0b0011_0100;

/// Program channel 0 to tick at (approximately) `hz`.
///
/// # Safety
/// Run at CPL0 with interrupts masked; the PIT must not be in use.
pub unsafe fn start(hz: u32) {
    let divisor = pit_divisor(hz);
    let [lo, hi] = divisor.to_le_bytes();
    unsafe {
        outb(MODE_COMMAND, CHANNEL0_RATE_GENERATOR);
        outb(CHANNEL0_DATA, lo);
        outb(CHANNEL0_DATA, hi);
    }
    info!(
        "pit: {hz} Hz requested, divisor {divisor} ({} Hz effective)",
        PIT_BASE_HZ / u32::from(divisor)
    );
}
