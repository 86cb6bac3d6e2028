//! # x86 I/O port access
//!
//! Thin wrappers around `in`/`out` for the legacy devices the kernel drives:
//!
//! ```text
//! 0x0020-0x0021   PIC #1 (command, data)
//! 0x0040-0x0043   PIT (channel 0 data at 0x40, mode/command at 0x43)
//! 0x0080          POST diagnostic port, used as an I/O delay
//! 0x00A0-0x00A1   PIC #2 (command, data)
//! 0x03F8-0x03FF   Serial port #1
//! ```

/// Write one byte to an I/O port (`out dx, al`).
///
/// # Safety
/// - Must run at CPL0 (or with I/O permission for `port`); otherwise `#GP`.
/// - `port` must belong to the intended device and the write must fit the
///   device's current protocol state.
/// - `out` is not a memory fence; add one if ordering with normal memory
///   matters.
#[inline]
pub unsafe fn outb(port: u16, val: u8) {
    unsafe {
        core::arch::asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags));
    }
}

/// Read one byte from an I/O port (`in al, dx`).
///
/// # Safety
/// Same requirements as [`outb`]; `port` must be a readable register.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let mut v: u8;
    unsafe {
        core::arch::asm!("in al, dx", in("dx") port, out("al") v, options(nomem, nostack, preserves_flags));
    }
    v
}

/// Roughly one microsecond of delay: a write to the unused POST port.
///
/// Older interrupt controllers need this between initialization words.
#[inline]
pub fn io_wait() {
    // SAFETY: port 0x80 is reserved for POST codes and ignores the value.
    unsafe { outb(0x80, 0) };
}
