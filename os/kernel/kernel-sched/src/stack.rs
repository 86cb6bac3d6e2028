use crate::TrapFrame;
use alloc::boxed::Box;
use alloc::vec;

/// 16 bytes, 16-aligned; the unit a stack region is made of.
#[derive(Copy, Clone)]
#[repr(C, align(16))]
struct Slot([u8; 16]);

/// A task's kernel stack plus the stack pointer saved across switches.
///
/// Stacks grow down from [`top`](Self::top). While the task runs, the saved
/// pointer is stale; it is refreshed by [`save_sp`](Self::save_sp) when the
/// timer trap preempts the task.
pub struct Stack {
    region: Option<Box<[Slot]>>,
    sp: u64,
}

impl Stack {
    /// A zeroed, owned stack of at least `size` bytes; the saved pointer
    /// starts at the top.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let slots = size.div_ceil(size_of::<Slot>()).max(1);
        let region = vec![Slot([0; 16]); slots].into_boxed_slice();
        let mut stack = Self {
            region: Some(region),
            sp: 0,
        };
        stack.sp = stack.top();
        stack
    }

    /// The stack the CPU is already running on (the boot context).
    ///
    /// Owns no memory; its pointer is only known after the first save.
    #[must_use]
    pub const fn adopted() -> Self {
        Self { region: None, sp: 0 }
    }

    /// Whether this stack owns its memory.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        self.region.is_some()
    }

    /// Lowest address of the owned region, `0` for an adopted stack.
    #[must_use]
    pub fn bottom(&self) -> u64 {
        self.region.as_ref().map_or(0, |r| r.as_ptr() as u64)
    }

    /// One past the highest address of the owned region, `0` for an adopted stack.
    #[must_use]
    pub fn top(&self) -> u64 {
        self.region
            .as_ref()
            .map_or(0, |r| r.as_ptr() as u64 + (r.len() * size_of::<Slot>()) as u64)
    }

    /// Whether `sp` lies within the owned region (always true when adopted).
    #[must_use]
    pub fn contains(&self, sp: u64) -> bool {
        !self.is_owned() || (self.bottom()..=self.top()).contains(&sp)
    }

    /// Record the live stack pointer of a preempted task.
    pub fn save_sp(&mut self, sp: u64) {
        debug_assert!(self.contains(sp), "saved sp {sp:#x} outside the task stack");
        self.sp = sp;
    }

    /// The stack pointer to resume the task from.
    #[must_use]
    pub const fn load_sp(&self) -> u64 {
        self.sp
    }

    /// Push `frame` below the saved pointer so that the next resumption pops it.
    ///
    /// # Panics
    /// If the stack is adopted or has no room for the frame.
    pub fn push(&mut self, frame: TrapFrame) {
        let Some(region) = self.region.as_mut() else {
            panic!("cannot seed an adopted stack");
        };
        let base = region.as_mut_ptr() as u64;
        let sp = self.sp - TrapFrame::SIZE as u64;
        assert!(sp >= base, "stack too small for a trap frame");

        let offset = (sp - base) as usize;
        // SAFETY: `offset .. offset + SIZE` lies within the owned region and
        // the region is 16-aligned, as is every frame boundary.
        unsafe {
            region
                .as_mut_ptr()
                .cast::<u8>()
                .add(offset)
                .cast::<TrapFrame>()
                .write(frame);
        }
        self.sp = sp;
    }

    /// The frame at the saved pointer, if the pointer is inside the region.
    #[must_use]
    pub fn frame_at_sp(&self) -> Option<TrapFrame> {
        let region = self.region.as_ref()?;
        let base = region.as_ptr() as u64;
        if self.sp < base || self.sp + TrapFrame::SIZE as u64 > self.top() {
            return None;
        }
        let offset = (self.sp - base) as usize;
        // SAFETY: bounds checked above; TrapFrame is plain data.
        Some(unsafe {
            region
                .as_ptr()
                .cast::<u8>()
                .add(offset)
                .cast::<TrapFrame>()
                .read()
        })
    }
}
