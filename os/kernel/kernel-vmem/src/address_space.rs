//! # Address Space (x86-64, PML4-rooted)
//!
//! One [`AddressSpace`] per task. Its root shares the kernel half with every
//! other space and exclusively owns the user half:
//!
//! ```text
//!            root (PML4)
//!  ┌───────────────┬───────────────┐
//!  │ 0..256 user   │ 256..512 kern │
//!  └──────┬────────┴───────┬───────┘
//!         │ owned          │ copied by value from the kernel root;
//!         ▼                ▼ never written, never freed
//!       PDPT ─► PD ─► PT ─► leaf frames
//! ```
//!
//! - [`AddressSpace::create`] allocates a zeroed root and copies the kernel
//!   root's upper-half entries into it.
//! - [`AddressSpace::destroy`] walks the user half post-order: leaves first,
//!   then each node, the root last.
//! - [`AddressSpace::take`] transfers the root out; the husk left behind owns
//!   nothing and its teardown is a no-op.
//!
//! No internal locking. The owner serializes access.

use crate::table::{Level, PageTable, Span};
use crate::{KernelRoot, PageEntry, VmemError};
use kernel_alloc::{PhysMapper, PhysicalMemory};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress};
use log::{debug, error, trace};

/// Handle to a single, concrete address space.
pub struct AddressSpace<'a, P: PhysicalMemory, M: PhysMapper> {
    root: Option<PhysicalPage>,
    pmm: &'a P,
    mapper: &'a M,
}

impl<'a, P: PhysicalMemory, M: PhysMapper> AddressSpace<'a, P, M> {
    /// Allocate a fresh root that shares the kernel half of `kernel`.
    ///
    /// # Errors
    /// [`VmemError::Alloc`] if no frame is left for the root.
    pub fn create(pmm: &'a P, mapper: &'a M, kernel: &KernelRoot) -> Result<Self, VmemError> {
        let root = pmm.alloc_frame()?;

        let table = unsafe { mapper.phys_to_mut::<PageTable>(root.base()) };
        table.zero();
        let kernel_table = unsafe { mapper.phys_to_mut::<PageTable>(kernel.page().base()) };
        table.kernel_half_mut().copy_from_slice(kernel_table.kernel_half());

        debug!("vmem: created address space, root {root}");
        Ok(Self {
            root: Some(root),
            pmm,
            mapper,
        })
    }

    /// The root frame, or `None` after ownership was transferred out.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> Option<PhysicalPage> {
        self.root
    }

    /// Move ownership of the tree into a new handle; `self` becomes empty.
    #[must_use = "dropping the returned space destroys it"]
    pub fn take(&mut self) -> Self {
        Self {
            root: self.root.take(),
            pmm: self.pmm,
            mapper: self.mapper,
        }
    }

    /// Free every frame reachable from the user half, then the root.
    ///
    /// Destroying an empty (transferred-out) space succeeds without work.
    ///
    /// # Errors
    /// The allocator rejected one of the frees.
    pub fn destroy(mut self) -> Result<(), VmemError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), VmemError> {
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        self.free_subtree(root, Level::Pml4, Span::UserHalf)?;
        debug!("vmem: destroyed address space, root {root}");
        Ok(())
    }

    /// Post-order release of `node` and everything below it within `span`.
    fn free_subtree(&self, node: PhysicalPage, level: Level, span: Span) -> Result<(), VmemError> {
        for i in span.slots() {
            let Some(target) = self.table(node).get(i).target() else {
                continue;
            };
            match level.lower() {
                None => {
                    trace!("vmem: free leaf {target}");
                    self.pmm.free_frame(target)?;
                }
                Some(lower) => self.free_subtree(target, lower, Span::All)?,
            }
        }
        self.pmm.free_frame(node)?;
        Ok(())
    }

    #[inline]
    fn root_or_err(&self) -> Result<PhysicalPage, VmemError> {
        self.root.ok_or(VmemError::Transferred)
    }

    #[inline]
    fn table(&self, page: PhysicalPage) -> &'a mut PageTable {
        // SAFETY: every node reachable from the root is a page table frame
        // obtained from the allocator and owned by this space (or the kernel
        // root, which is only read).
        unsafe { self.mapper.phys_to_mut::<PageTable>(page.base()) }
    }

    fn check_user_page(va: VirtualAddress) -> Result<(), VmemError> {
        if !va.is_canonical() {
            return Err(VmemError::NonCanonical(va));
        }
        if !va.is_user_half() {
            return Err(VmemError::KernelHalf(va));
        }
        if !va.is_page_aligned() {
            return Err(VmemError::Unaligned(va));
        }
        Ok(())
    }

    /// Map the user page at `va` to `frame` with the leaf bits of `flags`.
    ///
    /// Missing intermediate nodes are allocated zeroed. The space owns
    /// `frame` from now on and frees it on teardown.
    ///
    /// # Errors
    /// - [`VmemError::KernelHalf`], [`VmemError::NonCanonical`],
    ///   [`VmemError::Unaligned`] for an unusable `va`.
    /// - [`VmemError::AlreadyMapped`] if a leaf exists.
    /// - [`VmemError::Alloc`] if a node could not be allocated.
    pub fn map(&self, va: VirtualAddress, frame: PhysicalPage, flags: PageEntry) -> Result<(), VmemError> {
        Self::check_user_page(va)?;
        let mut node = self.root_or_err()?;

        let mut level = Level::Pml4;
        while let Some(lower) = level.lower() {
            let i = level.index_of(va);
            let table = self.table(node);
            node = if let Some(next) = table.get(i).target() {
                next
            } else {
                let next = self.pmm.alloc_frame()?;
                self.table(next).zero();
                table.set(i, PageEntry::user_link().with_frame(next));
                trace!("vmem: new level {} node {next}", lower.number());
                next
            };
            level = lower;
        }

        let i = Level::Pt.index_of(va);
        let pt = self.table(node);
        if pt.get(i).present() {
            return Err(VmemError::AlreadyMapped(va));
        }
        pt.set(i, flags.with_present(true).with_large_page(false).with_frame(frame));
        Ok(())
    }

    /// Remove the leaf at `va` and hand its frame back to the caller.
    ///
    /// Intermediate nodes stay allocated until teardown.
    ///
    /// # Errors
    /// [`VmemError::NotMapped`] if no leaf exists, plus the `va` checks of
    /// [`map`](Self::map).
    pub fn unmap(&self, va: VirtualAddress) -> Result<PhysicalPage, VmemError> {
        Self::check_user_page(va)?;
        let pt = self.leaf_table(va).ok_or(VmemError::NotMapped(va))?;

        let i = Level::Pt.index_of(va);
        let table = self.table(pt);
        let frame = table.get(i).target().ok_or(VmemError::NotMapped(va))?;
        table.set(i, PageEntry::ABSENT);
        Ok(frame)
    }

    /// Translate `va`, in either half.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let pt = self.leaf_table(va)?;
        let frame = self.table(pt).get(Level::Pt.index_of(va)).target()?;
        Some(frame.base() + va.page_offset())
    }

    /// Leaf entry at `va`, if present.
    #[must_use]
    pub fn entry(&self, va: VirtualAddress) -> Option<PageEntry> {
        let pt = self.leaf_table(va)?;
        let e = self.table(pt).get(Level::Pt.index_of(va));
        e.present().then_some(e)
    }

    /// Level-1 node covering `va`. Non-canonical addresses translate to nothing.
    fn leaf_table(&self, va: VirtualAddress) -> Option<PhysicalPage> {
        if !va.is_canonical() {
            return None;
        }
        let mut node = self.root?;
        let mut level = Level::Pml4;
        while let Some(lower) = level.lower() {
            node = self.table(node).get(level.index_of(va)).target()?;
            level = lower;
        }
        Some(node)
    }

    /// Load CR3 with this space's root.
    ///
    /// # Safety
    /// Code, stack and data in use must be mapped identically in the
    /// target space. The kernel half is, by construction.
    ///
    /// # Errors
    /// [`VmemError::Transferred`] for an empty space.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    pub unsafe fn activate(&self) -> Result<(), VmemError> {
        use kernel_registers::StoreRegisterUnsafe;
        use kernel_registers::cr3::Cr3;

        let root = self.root_or_err()?;
        unsafe { Cr3::from_root(root).store_unsafe() };
        Ok(())
    }
}

impl<P: PhysicalMemory, M: PhysMapper> Drop for AddressSpace<'_, P, M> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            error!("vmem: failed to destroy address space: {e}");
            panic!("failed to destroy address space: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PmmError;
    use crate::test_phys::TestPhys;
    use kernel_memory_addresses::PAGE_SIZE;

    type Space<'a> = AddressSpace<'a, TestPhys, TestPhys>;

    const USER_VA: u64 = 0x0000_0040_0020_0000;

    fn user(i: u64) -> VirtualAddress {
        VirtualAddress::new(USER_VA + i * PAGE_SIZE)
    }

    fn create<'a>(phys: &'a TestPhys, kernel: &KernelRoot) -> Space<'a> {
        AddressSpace::create(phys, phys, kernel).unwrap()
    }

    #[test]
    fn create_then_destroy_leaks_nothing_and_keeps_kernel_half() {
        let phys = TestPhys::with_frames(64);
        let kernel = phys.kernel_root_with_half_populated();
        let before = phys.kernel_half_snapshot(&kernel);
        let used = phys.used();

        let space = create(&phys, &kernel);
        let root = space.root().unwrap();
        assert_eq!(phys.table(root).kernel_half(), before.as_slice());
        assert!((0..256).all(|i| !phys.table(root).get(i).present()));

        space.destroy().unwrap();
        assert_eq!(phys.used(), used);
        assert_eq!(phys.kernel_half_snapshot(&kernel), before);
        assert_eq!(phys.freed(), vec![root]);
    }

    #[test]
    fn destroy_frees_leaves_and_user_nodes_only() {
        let phys = TestPhys::with_frames(96);
        let kernel = phys.kernel_root_with_half_populated();
        let kernel_frames = phys.used();

        let space = create(&phys, &kernel);
        // Two leaves share one PT; a third sits under another PML4 slot.
        let far = VirtualAddress::new(0x0000_0100_0000_0000);
        let mut leaves = Vec::new();
        for va in [user(0), user(1), far] {
            let frame = phys.alloc_frame().unwrap();
            space.map(va, frame, PageEntry::user_rw()).unwrap();
            leaves.push(frame);
        }
        // root + 2 × (PDPT, PD, PT) + 3 leaves
        assert_eq!(phys.used() - kernel_frames, 1 + 6 + 3);

        let root = space.root().unwrap();
        space.destroy().unwrap();

        let freed = phys.freed();
        assert_eq!(freed.len(), 10);
        assert_eq!(phys.used(), kernel_frames);
        for leaf in &leaves {
            assert!(freed.contains(leaf));
        }
        assert_eq!(freed.last(), Some(&root), "root is freed last");
        assert!(freed.iter().all(|f| !phys.is_kernel_frame(*f)));
    }

    #[test]
    fn nodes_are_freed_after_their_children() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let space = create(&phys, &kernel);
        let leaf = phys.alloc_frame().unwrap();
        space.map(user(0), leaf, PageEntry::user_rw()).unwrap();
        let pt = space.leaf_table(user(0)).unwrap();
        space.destroy().unwrap();

        let freed = phys.freed();
        let pos = |p| freed.iter().position(|f| *f == p).unwrap();
        assert!(pos(leaf) < pos(pt));
    }

    #[test]
    fn empty_space_leaves_boot_root_unchanged() {
        let phys = TestPhys::with_frames(16);
        let kernel = phys.kernel_root_with_half_populated();
        let before = phys.kernel_half_snapshot(&kernel);
        for _ in 0..3 {
            drop(create(&phys, &kernel));
        }
        assert_eq!(phys.kernel_half_snapshot(&kernel), before);
    }

    #[test]
    fn transferred_space_destroys_nothing() {
        let phys = TestPhys::with_frames(16);
        let kernel = phys.kernel_root_with_half_populated();
        let mut source = create(&phys, &kernel);
        let root = source.root();

        let owner = source.take();
        assert_eq!(source.root(), None);
        assert_eq!(owner.root(), root);

        source.destroy().unwrap();
        assert!(phys.freed().is_empty());
        drop(owner);
        assert_eq!(phys.freed(), vec![root.unwrap()]);
    }

    #[test]
    fn map_query_unmap() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let space = create(&phys, &kernel);
        let frame = phys.alloc_frame().unwrap();

        space.map(user(3), frame, PageEntry::user_rx()).unwrap();
        assert_eq!(
            space.query(user(3) + 0x123),
            Some(frame.base() + 0x123)
        );
        assert!(!space.entry(user(3)).unwrap().writable());
        assert_eq!(
            space.map(user(3), frame, PageEntry::user_rw()),
            Err(VmemError::AlreadyMapped(user(3)))
        );

        assert_eq!(space.unmap(user(3)), Ok(frame));
        assert_eq!(space.query(user(3)), None);
        assert_eq!(space.unmap(user(3)), Err(VmemError::NotMapped(user(3))));
        phys.free_frame(frame).unwrap();
    }

    #[test]
    fn kernel_half_is_readable_but_not_mappable() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let space = create(&phys, &kernel);

        let kva = TestPhys::KERNEL_VA;
        assert_eq!(space.query(kva), phys.kernel_query(&kernel, kva));
        assert!(space.query(kva).is_some());

        let frame = phys.alloc_frame().unwrap();
        assert_eq!(
            space.map(kva, frame, PageEntry::kernel_rw()),
            Err(VmemError::KernelHalf(kva))
        );
        assert_eq!(
            space.map(user(0) + 1, frame, PageEntry::user_rw()),
            Err(VmemError::Unaligned(user(0) + 1))
        );
        assert_eq!(
            space.map(VirtualAddress::new(0x0000_8000_0000_0000), frame, PageEntry::user_rw()),
            Err(VmemError::NonCanonical(VirtualAddress::new(0x0000_8000_0000_0000)))
        );
        phys.free_frame(frame).unwrap();
    }

    #[test]
    fn non_canonical_addresses_translate_to_nothing() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let space = create(&phys, &kernel);

        // Same table indices as KERNEL_VA, but bits 48..64 are not a sign extension.
        let alias = VirtualAddress::new(TestPhys::KERNEL_VA.as_u64() & 0x0000_ffff_ffff_ffff);
        assert!(!alias.is_canonical());
        assert!(space.query(TestPhys::KERNEL_VA).is_some());
        assert_eq!(space.query(alias), None);
        assert_eq!(space.entry(alias), None);
    }

    fn space_with_stolen_leaf<'a>(phys: &'a TestPhys, kernel: &KernelRoot) -> (Space<'a>, PhysicalPage) {
        let space = AddressSpace::create(phys, phys, kernel).unwrap();
        let leaf = phys.alloc_frame().unwrap();
        space.map(user(0), leaf, PageEntry::user_rw()).unwrap();
        phys.free_frame(leaf).unwrap();
        (space, leaf)
    }

    #[test]
    fn destroy_reports_a_leaf_freed_elsewhere() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let (space, leaf) = space_with_stolen_leaf(&phys, &kernel);

        assert_eq!(
            space.destroy(),
            Err(VmemError::Alloc(PmmError::NotAllocated(leaf.base())))
        );
    }

    #[test]
    #[should_panic(expected = "failed to destroy address space")]
    fn dropping_a_space_that_cannot_be_torn_down_is_fatal() {
        let phys = TestPhys::with_frames(32);
        let kernel = phys.kernel_root_with_half_populated();
        let (space, _leaf) = space_with_stolen_leaf(&phys, &kernel);
        drop(space);
    }

    #[test]
    fn create_reports_exhaustion() {
        let phys = TestPhys::with_frames(1);
        let kernel = KernelRoot::allocate(&phys, &phys).unwrap();
        assert!(matches!(
            AddressSpace::create(&phys, &phys, &kernel),
            Err(VmemError::Alloc(_))
        ));
    }

    #[test]
    fn transferred_space_rejects_mapping() {
        let phys = TestPhys::with_frames(8);
        let kernel = KernelRoot::allocate(&phys, &phys).unwrap();
        let mut space = create(&phys, &kernel);
        let owner = space.take();
        let frame = phys.alloc_frame().unwrap();
        assert_eq!(
            space.map(user(0), frame, PageEntry::user_rw()),
            Err(VmemError::Transferred)
        );
        drop(owner);
    }
}
