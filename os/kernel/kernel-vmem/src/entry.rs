use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};

/// A single 64-bit x86-64 page-table entry, any level.
///
/// Only 4 KiB translation is modelled, so the PS bit is always written as
/// zero: an entry at levels 2–4 references the next lower node, an entry at
/// level 1 references a leaf frame.
///
/// | Bits  | Name | Meaning |
/// |-------|------|---------|
/// | 0     | P    | Valid entry if set |
/// | 1     | RW   | Writable if set |
/// | 2     | US   | User-mode accessible if set |
/// | 3     | PWT  | Write-through caching |
/// | 4     | PCD  | Disable caching |
/// | 5     | A    | Accessed |
/// | 6     | D    | Dirty (leaf only) |
/// | 7     | PS   | Large page; always clear here |
/// | 8     | G    | Global (leaf only) |
/// | 9–11  |      | OS available |
/// | 12–51 | addr | Physical frame bits [51:12] |
/// | 52–62 |      | OS available / PKU |
/// | 63    | NX   | Execute disable |
///
/// ```rust
/// # use kernel_memory_addresses::PhysicalPage;
/// # use kernel_vmem::PageEntry;
/// let frame = PhysicalPage::from_number(0x345);
/// let e = PageEntry::user_rw().with_frame(frame);
/// assert!(e.present());
/// assert_eq!(e.frame(), frame);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntry {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    ///
    /// Must be set on every level of the walk for user access to succeed.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on the first write through a leaf.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Never set by this crate.
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global_translation: bool,

    #[bits(3)]
    pub os_available_low: u8,

    /// Physical address bits [51:12].
    #[bits(40)]
    frame_number: u64,

    #[bits(11)]
    __high: u16,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageEntry {
    /// The empty (not present) entry.
    pub const ABSENT: Self = Self::new();

    #[inline]
    #[must_use]
    pub const fn with_frame(self, frame: PhysicalPage) -> Self {
        self.with_frame_number(frame.number())
    }

    #[inline]
    #[must_use]
    pub const fn frame(&self) -> PhysicalPage {
        PhysicalPage::from_number(self.frame_number())
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.frame().base()
    }

    /// Present frame, if any.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> Option<PhysicalPage> {
        if self.present() { Some(self.frame()) } else { None }
    }

    /// Link to a lower node in the user half.
    ///
    /// Permissions are the intersection over the walk, so intermediate
    /// links are as permissive as possible and leaves decide.
    #[inline]
    #[must_use]
    pub const fn user_link() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }

    /// Kernel read/write, executable.
    #[inline]
    #[must_use]
    pub const fn kernel_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// User read/write, no execute.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_no_execute(true)
    }

    /// User read/execute.
    #[inline]
    #[must_use]
    pub const fn user_rx() -> Self {
        Self::new().with_present(true).with_user_access(true)
    }
}
