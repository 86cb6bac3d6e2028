//! # Port-based debug output
//!
//! Byte-at-a-time output over an x86 I/O port, for use before (and instead
//! of) any real console:
//!
//! ```text
//!  log::info!(..) ─► PortLogger ─┐
//!                                ├─► PortWriter (fmt::Write) ─► out dx, al
//!  qemu_trace!(..) ──────────────┘
//! ```
//!
//! * [`Port::DEBUGCON`] (`0x402`) is QEMU's debug console; capture it with
//!   `-debugcon stdio`.
//! * [`SerialSink::COM1`] is the first serial port, a 16550 UART driven
//!   through `uart_16550`: programmed once by [`SerialSink::init`], then
//!   written whenever the transmitter is empty.
//!
//! Nothing allocates. With the `enabled` feature off every write is a no-op.
//!
//! ```rust,no_run
//! use kernel_qemu::{Port, PortLogger};
//! use log::LevelFilter;
//!
//! static LOGGER: PortLogger = PortLogger::new(Port::DEBUGCON, LevelFilter::Debug);
//!
//! LOGGER.init().expect("logger initialization");
//! log::info!("kernel subsystem initialized");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;
mod port;
mod serial;

pub use logger::PortLogger;
pub use port::{Port, PortWriter, PutByte};
pub use serial::SerialSink;

#[doc(hidden)]
pub mod qemu_fmt {
    use crate::{Port, PortWriter};
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments<'_>) {
        // Best effort; there is nowhere to report a failed debug write.
        let _ = fmt::write(&mut PortWriter::new(&Port::DEBUGCON), args);
    }
}

/// `print!`-style raw output to QEMU's debug console, bypassing `log`.
///
/// Usable from the panic handler and before the logger is installed.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
