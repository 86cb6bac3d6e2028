//! # Interrupt Descriptor Table
//!
//! All 256 vectors point at one assembly stub each (see [`stubs`]); every
//! stub funnels into the same trampoline and from there into
//! [`kernel_trap::Dispatcher::dispatch`].
//!
//! Every gate is an **interrupt gate**, so the CPU clears `IF` on entry and
//! dispatch always runs with interrupts masked. Nothing is callable from
//! ring 3 (all DPLs are 0) and no IST stacks are used.

mod stubs;

use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};
use kernel_info::segments::KERNEL_CODE_SELECTOR;
use kernel_sync::BootOnce;
use log::debug;

const _: () = assert!(size_of::<IdtEntry>() == 16);
const _: () = assert!(align_of::<Idt>() == 16);

/// The middle two bytes of a gate: IST index and type/attributes.
///
/// ```text
/// 15 | 14 13 | 12 | 11..8 | 7..3 | 2..0
///  P |  DPL  |  S | type  |   0  | IST
/// ```
#[bitfield(u16)]
pub struct IdtGateAttr {
    #[bits(3)]
    pub ist: u8,
    #[bits(5)]
    __zero0: u8,
    /// `0xE` interrupt gate, `0xF` trap gate.
    #[bits(4)]
    pub typ: u8,
    /// Must be `0` for interrupt and trap gates.
    pub s: bool,
    #[bits(2)]
    pub dpl: u8,
    pub present: bool,
}

impl IdtGateAttr {
    #[inline]
    #[must_use]
    pub const fn kernel_interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_s(false).with_dpl(0).with_present(true)
    }
}

/// One 16-byte gate descriptor.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    ist_type: u16,
    offset_mid: u16,
    offset_hi: u32,
    zero: u32,
}

impl IdtEntry {
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        ist_type: IdtGateAttr::new().into_bits(),
        offset_mid: 0,
        offset_hi: 0,
        zero: 0,
    };

    /// A present ring-0 interrupt gate entering `handler` on the kernel code
    /// selector.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn interrupt_gate(handler: u64) -> Self {
        Self {
            offset_lo: handler as u16,
            selector: KERNEL_CODE_SELECTOR,
            ist_type: IdtGateAttr::kernel_interrupt_gate().into_bits(),
            offset_mid: (handler >> 16) as u16,
            offset_hi: (handler >> 32) as u32,
            zero: 0,
        }
    }

    pub const fn handler(&self) -> u64 {
        (self.offset_lo as u64) | ((self.offset_mid as u64) << 16) | ((self.offset_hi as u64) << 32)
    }

    pub const fn attributes(&self) -> IdtGateAttr {
        IdtGateAttr::from_bits(self.ist_type)
    }
}

#[repr(C, align(16))]
pub struct Idt {
    entries: [IdtEntry; 256],
}

impl Idt {
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// Load this table into IDTR.
    ///
    /// # Safety
    /// CPL0 only; every present entry must point at valid handler code.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn load(&'static self) {
        let idtr = Idtr {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        };
        unsafe {
            core::arch::asm!("lidt [{}]", in(reg) &raw const idtr, options(nostack, preserves_flags, readonly));
        }
    }
}

impl Index<usize> for Idt {
    type Output = IdtEntry;
    fn index(&self, i: usize) -> &Self::Output {
        &self.entries[i]
    }
}

impl IndexMut<usize> for Idt {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.entries[i]
    }
}

/// Operand of `lidt`.
#[repr(C, packed)]
struct Idtr {
    limit: u16,
    base: u64,
}

static IDT: BootOnce<Idt> = BootOnce::new();

/// Point every vector at its stub and load the table.
///
/// # Safety
/// Run once, at CPL0, with interrupts masked and the GDT loaded.
pub unsafe fn init() {
    let idt = IDT.get_or_init(|| {
        let mut idt = Idt::new();
        for vector in 0..=u8::MAX {
            idt[usize::from(vector)] = IdtEntry::interrupt_gate(stubs::entry_address(vector));
        }
        idt
    });

    debug_assert_eq!(idt[14].handler(), stubs::entry_address(14));
    debug_assert!(idt[32].attributes().present());

    unsafe { idt.load() };
    debug!(
        "idt: loaded, 256 gates, stubs at {:#x}..{:#x}",
        stubs::entry_address(0),
        stubs::entry_address(u8::MAX) + stubs::STUB_STRIDE
    );
}
