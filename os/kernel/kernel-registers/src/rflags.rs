use bitfield_struct::bitfield;

/// Architectural RFLAGS model for x86-64.
///
/// Only the bits the kernel reads or seeds are named; the arithmetic status
/// flags are folded into padding. Bit 1 is fixed to `1` in 64-bit mode and
/// defaults accordingly, so `Rflags::new()` is already a valid value.
#[bitfield(u64, order = Lsb)]
pub struct Rflags {
    /// Carry Flag
    pub cf_carry: bool, // 0

    /// Always 1 in 64-bit mode.
    #[bits(default = true)]
    _always1: bool, // 1

    /// PF, AF, ZF, SF and their reserved neighbours.
    #[bits(6)]
    __status: u8, // 2–7

    /// Trap Flag
    pub tf_trap: bool, // 8

    /// Interrupt Enable Flag
    pub if_interrupt_enable: bool, // 9

    /// Direction Flag
    pub df_direction: bool, // 10

    /// Overflow Flag
    pub of_overflow: bool, // 11

    /// I/O Privilege Level (2 bits)
    #[bits(2)]
    pub iopl: u8, // 12–13

    #[bits(50)]
    __rest: u64, // 14–63
}

impl Rflags {
    /// Flags a freshly started task resumes with: reserved bit set,
    /// interrupts enabled, everything else clear (`0x202`).
    #[inline]
    #[must_use]
    pub const fn task_entry() -> Self {
        Self::new().with_if_interrupt_enable(true)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::LoadRegister for Rflags {
    #[inline]
    fn load() -> Self {
        let r: u64;
        unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nomem, preserves_flags)) }
        Self::from_bits(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_entry_flags_are_0x202() {
        assert_eq!(Rflags::task_entry().into_bits(), 0x202);
        assert!(Rflags::from_bits(0x202).if_interrupt_enable());
    }
}
