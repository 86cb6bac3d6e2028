//! # Logging Defaults

use log::LevelFilter;

/// Level the kernel logger starts with.
#[cfg(debug_assertions)]
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Debug;

/// Level the kernel logger starts with.
#[cfg(not(debug_assertions))]
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Log target used for CPU fault diagnostics.
pub const TRAP_TARGET: &str = "trap";
