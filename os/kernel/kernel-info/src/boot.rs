//! # Kernel Boot Information

/// What the loader tells the kernel right after `ExitBootServices`.
///
/// Keep this `#[repr(C)]` and prefer fixed-size integers at the ABI boundary.
#[repr(C)]
#[derive(Clone, Debug)]
pub struct KernelBootInfo {
    /// Largest run of conventional memory the loader left untouched.
    /// The kernel's frame allocator manages exactly this run.
    pub usable: PhysRegion,
}

/// A physical byte range `[base .. base + len)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PhysRegion {
    pub base: u64,
    pub len: u64,
}

impl PhysRegion {
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
