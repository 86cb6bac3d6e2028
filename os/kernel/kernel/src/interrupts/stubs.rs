//! Per-vector entry stubs and the common trap trampoline.
//!
//! Each stub is padded to [`STUB_STRIDE`] bytes, so vector `n` enters at
//! `trap_stubs + n * STUB_STRIDE`. A stub evens out the frame (pushes a
//! zero error code when the CPU did not push one), pushes its vector and
//! jumps to `trap_common`, which completes a [`kernel_sched::TrapFrame`]:
//!
//! ```text
//!  high   ss, rsp, rflags, cs, rip      pushed by the CPU
//!         error_code, vector            pushed by the stub
//!  low    rax .. r15                    pushed by trap_common   <- rsp
//! ```
//!
//! `trap_common` calls `trap_dispatch(rsp) -> rsp` and resumes from whatever
//! stack pointer comes back, which is how the timer switches tasks.

use crate::trap_dispatch;
use core::arch::global_asm;

/// Bytes between consecutive stubs.
pub const STUB_STRIDE: u64 = 16;

/// Exceptions for which the CPU pushes an error code: 8, 10-14, 17, 21, 29, 30.
pub const ERROR_CODE_VECTORS: u32 = 0x6022_7D00;

global_asm!(
    r#"
    .section .text.trap, "ax"
    .balign 16
    .global trap_stubs
trap_stubs:
    .set vec, 0
    .rept 256
        .balign {stride}
        .set has_err, 0
        .if vec < 32
            .set has_err, ({mask} >> vec) & 1
        .endif
        .if has_err == 0
            pushq $0
        .endif
        pushq $vec
        jmp trap_common
        .set vec, vec + 1
    .endr

trap_common:
    pushq %rax
    pushq %rbx
    pushq %rcx
    pushq %rdx
    pushq %rsi
    pushq %rdi
    pushq %rbp
    pushq %r8
    pushq %r9
    pushq %r10
    pushq %r11
    pushq %r12
    pushq %r13
    pushq %r14
    pushq %r15

    cld
    movq %rsp, %rdi
    call {dispatch}
    movq %rax, %rsp

    popq %r15
    popq %r14
    popq %r13
    popq %r12
    popq %r11
    popq %r10
    popq %r9
    popq %r8
    popq %rbp
    popq %rdi
    popq %rsi
    popq %rdx
    popq %rcx
    popq %rbx
    popq %rax
    addq $16, %rsp
    iretq
    "#,
    stride = const STUB_STRIDE,
    mask = const ERROR_CODE_VECTORS,
    dispatch = sym trap_dispatch,
    options(att_syntax)
);

unsafe extern "C" {
    fn trap_stubs();
}

/// Entry address of the stub for `vector`.
pub fn entry_address(vector: u8) -> u64 {
    trap_stubs as usize as u64 + u64::from(vector) * STUB_STRIDE
}

const _: () = {
    let mut v = 0;
    let mut expected = 0u32;
    while v < 32 {
        if matches!(v, 8 | 10..=14 | 17 | 21 | 29 | 30) {
            expected |= 1 << v;
        }
        v += 1;
    }
    assert!(expected == ERROR_CODE_VECTORS);
};
