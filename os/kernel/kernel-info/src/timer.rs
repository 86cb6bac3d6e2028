//! # Timer Configuration

/// Scheduler tick rate, programmed into the PIT once at bootstrap.
pub const TIMER_HZ: u32 = 1000;

/// Input clock of the 8253/8254 PIT.
pub const PIT_BASE_HZ: u32 = 1_193_182;

/// Reload value that makes the PIT fire at `hz`.
///
/// Clamped to the 16-bit counter; a result of `0` never occurs.
#[must_use]
pub const fn pit_divisor(hz: u32) -> u16 {
    let hz = if hz == 0 { 1 } else { hz };
    let div = PIT_BASE_HZ / hz;
    if div > u16::MAX as u32 {
        u16::MAX
    } else if div == 0 {
        1
    } else {
        div as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_divisor() {
        assert_eq!(pit_divisor(TIMER_HZ), 1193);
    }

    #[test]
    fn divisor_is_clamped() {
        assert_eq!(pit_divisor(1), u16::MAX);
        assert_eq!(pit_divisor(0), u16::MAX);
        assert_eq!(pit_divisor(u32::MAX), 1);
    }
}
