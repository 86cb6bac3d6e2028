//! # Segment Layout
//!
//! GDT slot numbers and the selectors derived from them. A selector is
//! `index * 8 | RPL`; kernel selectors use RPL 0.

/// Null descriptor.
pub const NULL_INDEX: u16 = 0;

/// 64-bit kernel code segment.
pub const KERNEL_CODE_INDEX: u16 = 1;

/// Kernel data segment.
pub const KERNEL_DATA_INDEX: u16 = 2;

/// `CS` for kernel code and for every task the scheduler starts.
pub const KERNEL_CODE_SELECTOR: u16 = KERNEL_CODE_INDEX * 8;

/// `SS`/`DS` for kernel code and for every task the scheduler starts.
pub const KERNEL_DATA_SELECTOR: u16 = KERNEL_DATA_INDEX * 8;

const _: () = {
    assert!(KERNEL_CODE_SELECTOR == 0x08);
    assert!(KERNEL_DATA_SELECTOR == 0x10);
};
