/// Names of the 32 architecturally defined exception vectors, by vector.
pub const FAULT_NAMES: [&str; 32] = [
    "division-by-zero",
    "debug",
    "non-maskable-interrupt",
    "breakpoint",
    "detected-overflow",
    "out-of-bounds",
    "invalid-opcode",
    "no-coprocessor",
    "double-fault",
    "coprocessor-segment-overrun",
    "bad-tss",
    "segment-not-present",
    "stack-fault",
    "general-protection-fault",
    "page-fault",
    "unknown-interrupt",
    "coprocessor-fault",
    "alignment-check",
    "machine-check",
    "simd-floating-point-exception",
    "virtualization-exception",
    "control-protection-exception",
    "reserved",
    "hypervisor-injection-exception",
    "vmm-communication-exception",
    "security-exception",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
];

/// Name of exception `vector`, or `None` past the exception range.
#[must_use]
pub fn fault_name(vector: u64) -> Option<&'static str> {
    usize::try_from(vector)
        .ok()
        .and_then(|v| FAULT_NAMES.get(v))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_vectors() {
        assert_eq!(fault_name(0), Some("division-by-zero"));
        assert_eq!(fault_name(8), Some("double-fault"));
        assert_eq!(fault_name(13), Some("general-protection-fault"));
        assert_eq!(fault_name(14), Some("page-fault"));
        assert_eq!(fault_name(31), Some("reserved"));
        assert_eq!(fault_name(32), None);
    }
}
