//! # 8259A programmable interrupt controller pair
//!
//! The PICs power up delivering IRQ 0..15 on vectors 8..23, on top of CPU
//! exceptions. Remapping moves them to [`MASTER_OFFSET`]`..+16`, so the
//! timer (IRQ 0) lands on vector 32.

use crate::ports::{inb, io_wait, outb};
use log::debug;

const MASTER_COMMAND: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_COMMAND: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x10;
const ICW1_ICW4: u8 = 0x01;
const ICW4_8086: u8 = 0x01;
const EOI: u8 = 0x20;

/// Vector of IRQ 0.
pub const MASTER_OFFSET: u8 = kernel_trap::TIMER_VECTOR;

/// Vector of IRQ 8.
pub const SLAVE_OFFSET: u8 = MASTER_OFFSET + 8;

/// Remap both controllers and leave only the timer (IRQ 0) and the cascade
/// line (IRQ 2) unmasked.
///
/// # Safety
/// Run once, at CPL0, with interrupts masked.
pub unsafe fn remap() {
    unsafe {
        // ICW1: start initialization, ICW4 follows.
        outb(MASTER_COMMAND, ICW1_INIT | ICW1_ICW4);
        io_wait();
        outb(SLAVE_COMMAND, ICW1_INIT | ICW1_ICW4);
        io_wait();

        // ICW2: vector offsets.
        outb(MASTER_DATA, MASTER_OFFSET);
        io_wait();
        outb(SLAVE_DATA, SLAVE_OFFSET);
        io_wait();

        // ICW3: slave on IRQ 2; slave cascade identity 2.
        outb(MASTER_DATA, 0b0000_0100);
        io_wait();
        outb(SLAVE_DATA, 0x02);
        io_wait();

        outb(MASTER_DATA, ICW4_8086);
        io_wait();
        outb(SLAVE_DATA, ICW4_8086);
        io_wait();

        outb(MASTER_DATA, !0b0000_0101);
        outb(SLAVE_DATA, 0xFF);

        debug!(
            "pic: remapped to {MASTER_OFFSET}/{SLAVE_OFFSET}, masks {:#04x}/{:#04x}",
            inb(MASTER_DATA),
            inb(SLAVE_DATA)
        );
    }
}

/// End-of-interrupt for the line behind `vector`. Vectors outside the
/// remapped range were not raised by a PIC and are ignored.
pub fn end_of_interrupt(vector: u8) {
    if !(MASTER_OFFSET..SLAVE_OFFSET + 8).contains(&vector) {
        return;
    }

    // SAFETY: EOI writes are valid in any controller state after remap.
    unsafe {
        if vector >= SLAVE_OFFSET {
            outb(SLAVE_COMMAND, EOI);
        }
        outb(MASTER_COMMAND, EOI);
    }
}
