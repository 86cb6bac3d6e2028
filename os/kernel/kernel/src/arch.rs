//! x86-64 side of trap dispatch.

use crate::pic;
use kernel_registers::LoadRegisterUnsafe;
use kernel_registers::cr2::Cr2;
use kernel_registers::cr3::Cr3;
use kernel_sync::{InterruptControl, X86Interrupts};
use kernel_trap::TrapArch;

/// 8259 acknowledge, control registers read at CPL0, `cli; hlt` forever.
#[derive(Copy, Clone, Debug, Default)]
pub struct X86TrapArch;

impl TrapArch for X86TrapArch {
    fn ack(&self, vector: u8) {
        pic::end_of_interrupt(vector);
    }

    fn fault_address(&self) -> u64 {
        // SAFETY: dispatch runs at CPL0.
        unsafe { Cr2::load_unsafe() }.into_bits()
    }

    fn page_table_base(&self) -> u64 {
        // SAFETY: dispatch runs at CPL0.
        unsafe { Cr3::load_unsafe() }.root_address().as_u64()
    }

    fn halt(&self) -> ! {
        X86Interrupts.halt_forever()
    }
}
