use crate::PutByte;
use uart_16550::MmioSerialPort;
#[cfg(target_arch = "x86_64")]
use uart_16550::SerialPort;

/// A 16550 UART as a log sink.
///
/// The UART keeps no state between bytes, so each write drives a fresh
/// `uart_16550` handle over the same registers. Two contexts writing at once
/// interleave bytes but never alias a `&mut`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SerialSink(Registers);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Registers {
    /// I/O port base.
    Pio(u16),
    /// Memory-mapped base, one byte per register.
    Mmio(usize),
}

impl SerialSink {
    /// First PC serial port.
    pub const COM1: Self = Self(Registers::Pio(0x3F8));

    /// A UART whose registers are mapped at `base`.
    ///
    /// # Safety
    /// `base..base + 8` must stay mapped to a 16550 register block for as
    /// long as the sink is used.
    #[must_use]
    pub const unsafe fn mmio(base: usize) -> Self {
        Self(Registers::Mmio(base))
    }

    /// Program 38400 baud 8N1 with FIFOs on. Call once before the first
    /// write; an unprogrammed UART drops or garbles output on real hardware.
    pub fn init(&self) {
        if !cfg!(feature = "enabled") {
            return;
        }
        match self.0 {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: PIO sinks are only built for the fixed COM ports.
            Registers::Pio(base) => unsafe { SerialPort::new(base) }.init(),
            #[cfg(not(target_arch = "x86_64"))]
            Registers::Pio(_) => {}
            // SAFETY: guaranteed by `SerialSink::mmio`.
            Registers::Mmio(base) => unsafe { MmioSerialPort::new(base) }.init(),
        }
    }
}

impl PutByte for SerialSink {
    /// Waits for an empty transmitter, then writes `byte`.
    fn put(&self, byte: u8) {
        if !cfg!(feature = "enabled") {
            return;
        }
        match self.0 {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: see `init`.
            Registers::Pio(base) => unsafe { SerialPort::new(base) }.send(byte),
            #[cfg(not(target_arch = "x86_64"))]
            Registers::Pio(_) => {}
            // SAFETY: see `init`.
            Registers::Mmio(base) => unsafe { MmioSerialPort::new(base) }.send(byte),
        }
    }
}
