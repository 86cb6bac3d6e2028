use core::fmt;

/// A byte-wide output channel.
pub trait PutByte {
    fn put(&self, byte: u8);
}

/// An x86 I/O port written with `out dx, al`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Port(u16);

impl Port {
    /// QEMU `-debugcon`.
    pub const DEBUGCON: Self = Self(0x402);

    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self(port)
    }

    #[must_use]
    pub const fn number(self) -> u16 {
        self.0
    }
}

impl PutByte for Port {
    #[inline]
    fn put(&self, byte: u8) {
        #[cfg(all(feature = "enabled", target_arch = "x86_64"))]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") self.0,
                in("al") byte,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(all(feature = "enabled", target_arch = "x86_64")))]
        let _ = byte;
    }
}

/// [`fmt::Write`] over any [`PutByte`].
pub struct PortWriter<'a, P: PutByte + ?Sized> {
    out: &'a P,
}

impl<'a, P: PutByte + ?Sized> PortWriter<'a, P> {
    pub const fn new(out: &'a P) -> Self {
        Self { out }
    }
}

impl<P: PutByte + ?Sized> fmt::Write for PortWriter<'_, P> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|b| self.out.put(b));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use core::fmt::Write;

    #[derive(Default)]
    struct Bytes(RefCell<Vec<u8>>);

    impl PutByte for Bytes {
        fn put(&self, byte: u8) {
            self.0.borrow_mut().push(byte);
        }
    }

    #[test]
    fn writer_emits_utf8_bytes() {
        let out = Bytes::default();
        write!(PortWriter::new(&out), "ok {} µ", 7).unwrap();
        assert_eq!(out.0.borrow().as_slice(), "ok 7 µ".as_bytes());
    }
}
