//! # Global Descriptor Table for a ring-0-only kernel
//!
//! Long mode ignores base and limit of code and data segments, but the CPU
//! still needs a 64-bit code descriptor in `CS` and a data descriptor in
//! `SS` to deliver interrupts and `iretq` back. No task runs in ring 3, so
//! there are no user descriptors and no TSS.
//!
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Kernel code (64-bit, DPL=0)
//! 2     | 0x10     | Kernel data (DPL=0)

use bitfield_struct::bitfield;
use kernel_info::segments::{KERNEL_CODE_INDEX, KERNEL_CODE_SELECTOR, KERNEL_DATA_INDEX, KERNEL_DATA_SELECTOR};
use log::debug;

/// Code and data segment descriptor bits that matter in long mode.
#[bitfield(u64)]
#[allow(dead_code)]
struct SegmentBits {
    /// Limit and base, ignored in long mode.
    #[bits(40)]
    __limit_base: u64, // [39:0]
    /// `0b1010` execute/read code, `0b0010` read/write data.
    #[bits(4)]
    typ: u8, // [43:40]
    /// Code/data (as opposed to system) descriptor.
    s: bool, // [44]
    #[bits(2)]
    dpl: u8, // [46:45]
    p: bool, // [47]
    #[bits(5)]
    __limit_hi_avl: u8, // [52:48]
    /// 64-bit code.
    l: bool, // [53]
    /// Must be clear when `l` is set.
    db: bool, // [54]
    g: bool, // [55]
    __base_hi: u8, // [63:56]
}

impl SegmentBits {
    const fn kernel_code() -> Self {
        Self::new().with_typ(0b1010).with_s(true).with_dpl(0).with_p(true).with_l(true)
    }

    const fn kernel_data() -> Self {
        Self::new().with_typ(0b0010).with_s(true).with_dpl(0).with_p(true)
    }
}

#[repr(C, align(16))]
struct Gdt {
    entries: [u64; 3],
}

impl Gdt {
    const fn new() -> Self {
        let mut entries = [0; 3];
        entries[KERNEL_CODE_INDEX as usize] = SegmentBits::kernel_code().into_bits();
        entries[KERNEL_DATA_INDEX as usize] = SegmentBits::kernel_data().into_bits();
        Self { entries }
    }
}

static GDT: Gdt = Gdt::new();

/// Operand of `lgdt`.
#[repr(C, packed)]
struct DescTablePtr {
    limit: u16,
    base: u64,
}

/// Load [`GDT`], reload the data segment registers and far-return into the
/// kernel code selector.
///
/// # Safety
/// Run once, at CPL0, with interrupts masked.
#[allow(clippy::cast_possible_truncation)]
pub unsafe fn init() {
    let ptr = DescTablePtr {
        limit: (size_of::<Gdt>() - 1) as u16,
        base: (&raw const GDT) as u64,
    };

    unsafe {
        core::arch::asm!(
            "lgdt [{}]",
            in(reg) &raw const ptr,
            options(readonly, nostack, preserves_flags)
        );

        core::arch::asm!(
            "mov ds, {0:x}",
            "mov es, {0:x}",
            "mov ss, {0:x}",
            "mov fs, {0:x}",
            "mov gs, {0:x}",
            in(reg) KERNEL_DATA_SELECTOR,
            options(nostack, preserves_flags)
        );

        // Far reload of CS: push target CS and RIP, then far return.
        core::arch::asm!(
            "push {cs}",
            "lea {tmp}, [rip + 2f]",
            "push {tmp}",
            "retfq",
            "2:",
            cs = in(reg) u64::from(KERNEL_CODE_SELECTOR),
            tmp = lateout(reg) _,
        );
    }

    debug!("gdt: loaded, cs={KERNEL_CODE_SELECTOR:#x} ss={KERNEL_DATA_SELECTOR:#x}");
}

const _: () = {
    assert!(size_of::<SegmentBits>() == 8);
    assert!(SegmentBits::kernel_code().into_bits() == 0x0020_9A00_0000_0000);
    assert!(SegmentBits::kernel_data().into_bits() == 0x0000_9200_0000_0000);
};
