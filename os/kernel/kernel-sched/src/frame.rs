use kernel_info::segments::{KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR};
use kernel_registers::rflags::Rflags;

/// Argument registers of a new task, in order `rdi, rsi, rdx, rcx, r8`.
pub type TaskArgs = [u64; 5];

/// Snapshot of an interrupted (or not yet started) execution context.
///
/// Memory layout, lowest address first, is the reverse of the push order:
/// the CPU pushes `ss` down to `rip`, the vector stub pushes `error_code`
/// (a zero when the CPU does not) and `vector`, the common trampoline
/// pushes `rax` first and `r15` last. `rsp` after the pushes points at `r15`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,

    pub vector: u64,
    pub error_code: u64,

    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl TrapFrame {
    /// Size in bytes; a multiple of 16, so pushing a frame keeps alignment.
    pub const SIZE: usize = size_of::<Self>();

    /// First resumption of a kernel-privilege task: jumps to `ip` with
    /// stack pointer `sp`, `args` in the argument registers, interrupts on.
    #[must_use]
    pub fn kernel_entry(ip: u64, sp: u64, args: TaskArgs) -> Self {
        Self {
            rdi: args[0],
            rsi: args[1],
            rdx: args[2],
            rcx: args[3],
            r8: args[4],
            rip: ip,
            rsp: sp,
            cs: u64::from(KERNEL_CODE_SELECTOR),
            ss: u64::from(KERNEL_DATA_SELECTOR),
            rflags: Rflags::task_entry().into_bits(),
            ..Self::default()
        }
    }
}

const _: () = assert!(TrapFrame::SIZE == 22 * 8);
const _: () = assert!(TrapFrame::SIZE.is_multiple_of(16));

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn layout_matches_push_order() {
        assert_eq!(offset_of!(TrapFrame, r15), 0);
        assert_eq!(offset_of!(TrapFrame, rax), 14 * 8);
        assert_eq!(offset_of!(TrapFrame, vector), 15 * 8);
        assert_eq!(offset_of!(TrapFrame, error_code), 16 * 8);
        assert_eq!(offset_of!(TrapFrame, rip), 17 * 8);
        assert_eq!(offset_of!(TrapFrame, ss), 21 * 8);
    }

    #[test]
    fn kernel_entry_seeds_registers() {
        let f = TrapFrame::kernel_entry(0x1000, 0x8000, [1, 2, 3, 4, 5]);
        assert_eq!((f.rdi, f.rsi, f.rdx, f.rcx, f.r8), (1, 2, 3, 4, 5));
        assert_eq!(f.rip, 0x1000);
        assert_eq!(f.rsp, 0x8000);
        assert_eq!(f.cs, 0x08);
        assert_eq!(f.ss, 0x10);
        assert_eq!(f.rflags, 0x202);
        assert_eq!(f.rax, 0);
    }
}
