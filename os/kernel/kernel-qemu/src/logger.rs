use crate::{Port, PortWriter, PutByte};
use core::fmt::Write;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` sink writing `[LEVEL] target: message` lines to a port.
pub struct PortLogger<P: PutByte = Port> {
    out: P,
    max_level: LevelFilter,
}

impl<P: PutByte> PortLogger<P> {
    #[must_use]
    pub const fn new(out: P, max_level: LevelFilter) -> Self {
        Self { out, max_level }
    }

    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// The output the lines go to.
    pub const fn sink(&self) -> &P {
        &self.out
    }
}

impl<P: PutByte + Send + Sync> PortLogger<P> {
    /// Install as the global logger. Call once during early init.
    ///
    /// # Errors
    /// A logger is already installed.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl<P: PutByte + Send + Sync> Log for PortLogger<P> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let _ = writeln!(
            PortWriter::new(&self.out),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
