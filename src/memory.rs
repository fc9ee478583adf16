//! Mapped SDRAM window and memory ordering.

use core::sync::atomic::{fence, Ordering};

use crate::geometry::GEOMETRY;

/// Linear window onto the device, addressed by byte offset from its base.
///
/// Implementors only have to provide byte access; the wider and bulk
/// accessors default to byte loops in native byte order.
pub trait MappedMemory {
    /// Bus address of offset 0. Used to pick aligned access paths.
    fn address(&self) -> usize;

    fn read_u8(&self, offset: usize) -> u8;

    fn write_u8(&mut self, offset: usize, value: u8);

    /// `offset` is 2-byte aligned relative to the bus address.
    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_ne_bytes([self.read_u8(offset), self.read_u8(offset + 1)])
    }

    /// `offset` is 2-byte aligned relative to the bus address.
    fn write_u16(&mut self, offset: usize, value: u16) {
        for (i, b) in value.to_ne_bytes().into_iter().enumerate() {
            self.write_u8(offset + i, b);
        }
    }

    /// `offset` is 4-byte aligned relative to the bus address.
    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = self.read_u8(offset + i);
        }
        u32::from_ne_bytes(bytes)
    }

    /// `offset` is 4-byte aligned relative to the bus address.
    fn write_u32(&mut self, offset: usize, value: u32) {
        for (i, b) in value.to_ne_bytes().into_iter().enumerate() {
            self.write_u8(offset + i, b);
        }
    }

    /// Contiguous copy out of the window.
    fn read(&self, offset: usize, dst: &mut [u8]) {
        for (i, b) in dst.iter_mut().enumerate() {
            *b = self.read_u8(offset + i);
        }
    }

    /// Contiguous copy into the window.
    fn write(&mut self, offset: usize, src: &[u8]) {
        for (i, &b) in src.iter().enumerate() {
            self.write_u8(offset + i, b);
        }
    }

    /// Set `len` bytes to `value`.
    fn fill(&mut self, offset: usize, len: usize, value: u8) {
        for i in 0..len {
            self.write_u8(offset + i, value);
        }
    }
}

impl<T: MappedMemory + ?Sized> MappedMemory for &mut T {
    fn address(&self) -> usize {
        T::address(self)
    }
    fn read_u8(&self, offset: usize) -> u8 {
        T::read_u8(self, offset)
    }
    fn write_u8(&mut self, offset: usize, value: u8) {
        T::write_u8(self, offset, value)
    }
    fn read_u16(&self, offset: usize) -> u16 {
        T::read_u16(self, offset)
    }
    fn write_u16(&mut self, offset: usize, value: u16) {
        T::write_u16(self, offset, value)
    }
    fn read_u32(&self, offset: usize) -> u32 {
        T::read_u32(self, offset)
    }
    fn write_u32(&mut self, offset: usize, value: u32) {
        T::write_u32(self, offset, value)
    }
    fn read(&self, offset: usize, dst: &mut [u8]) {
        T::read(self, offset, dst)
    }
    fn write(&mut self, offset: usize, src: &[u8]) {
        T::write(self, offset, src)
    }
    fn fill(&mut self, offset: usize, len: usize, value: u8) {
        T::fill(self, offset, len, value)
    }
}

/// Volatile view of the device at its bus address.
pub struct Mmio {
    base: *mut u8,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must point to at least `GEOMETRY.capacity` bytes of mapped
    /// device memory that nothing else accesses through Rust references.
    pub const unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }

    /// Window at the fixed device base address.
    ///
    /// # Safety
    ///
    /// The controller must map the device at `GEOMETRY.base`; see [`Mmio::new`].
    pub const unsafe fn steal() -> Self {
        Self::new(GEOMETRY.base as *mut u8)
    }
}

impl MappedMemory for Mmio {
    fn address(&self) -> usize {
        self.base as usize
    }

    #[inline(always)]
    fn read_u8(&self, offset: usize) -> u8 {
        unsafe { self.base.add(offset).read_volatile() }
    }

    #[inline(always)]
    fn write_u8(&mut self, offset: usize, value: u8) {
        unsafe { self.base.add(offset).write_volatile(value) }
    }

    #[inline(always)]
    fn read_u16(&self, offset: usize) -> u16 {
        debug_assert!(is_aligned(self.address() + offset, 2));
        unsafe { self.base.add(offset).cast::<u16>().read_volatile() }
    }

    #[inline(always)]
    fn write_u16(&mut self, offset: usize, value: u16) {
        debug_assert!(is_aligned(self.address() + offset, 2));
        unsafe { self.base.add(offset).cast::<u16>().write_volatile(value) }
    }

    #[inline(always)]
    fn read_u32(&self, offset: usize) -> u32 {
        debug_assert!(is_aligned(self.address() + offset, 4));
        unsafe { self.base.add(offset).cast::<u32>().read_volatile() }
    }

    #[inline(always)]
    fn write_u32(&mut self, offset: usize, value: u32) {
        debug_assert!(is_aligned(self.address() + offset, 4));
        unsafe { self.base.add(offset).cast::<u32>().write_volatile(value) }
    }

    fn read(&self, offset: usize, dst: &mut [u8]) {
        unsafe { core::ptr::copy_nonoverlapping(self.base.add(offset), dst.as_mut_ptr(), dst.len()) }
    }

    fn write(&mut self, offset: usize, src: &[u8]) {
        unsafe { core::ptr::copy_nonoverlapping(src.as_ptr(), self.base.add(offset), src.len()) }
    }

    fn fill(&mut self, offset: usize, len: usize, value: u8) {
        unsafe { core::ptr::write_bytes(self.base.add(offset), value, len) }
    }
}

/// Full read/write ordering point after accesses to the window.
pub trait Barrier {
    fn barrier(&mut self);
}

/// [`Barrier`] backed by a sequentially consistent fence.
#[derive(Clone, Copy, Default, Debug)]
pub struct Fence;

impl Barrier for Fence {
    #[inline(always)]
    fn barrier(&mut self) {
        fence(Ordering::SeqCst);
    }
}

impl<T: Barrier + ?Sized> Barrier for &mut T {
    fn barrier(&mut self) {
        T::barrier(self)
    }
}

#[inline(always)]
pub(crate) const fn is_aligned(addr: usize, width: usize) -> bool {
    addr & (width - 1) == 0
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Access width of the bulk operations: `u8`, `u16` or `u32`.
pub trait Word: sealed::Sealed + Copy + PartialEq + 'static {
    const WIDTH: usize;

    /// Load one element. Aligned offsets use a single access of the full
    /// width, misaligned ones fall back to bytes.
    fn load<M: MappedMemory + ?Sized>(mem: &M, offset: usize) -> Self;

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, offset: usize, value: Self);

    fn as_bytes(words: &[Self]) -> &[u8] {
        // SAFETY: sealed to plain integers without padding
        unsafe { core::slice::from_raw_parts(words.as_ptr().cast::<u8>(), core::mem::size_of_val(words)) }
    }

    fn as_bytes_mut(words: &mut [Self]) -> &mut [u8] {
        // SAFETY: sealed to plain integers, every bit pattern is valid
        unsafe {
            core::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), core::mem::size_of_val(words))
        }
    }
}

impl Word for u8 {
    const WIDTH: usize = 1;

    fn load<M: MappedMemory + ?Sized>(mem: &M, offset: usize) -> Self {
        mem.read_u8(offset)
    }

    fn store<M: MappedMemory + ?Sized>(mem: &mut M, offset: usize, value: Self) {
        mem.write_u8(offset, value)
    }
}

macro_rules! impl_word {
    ($ty:ty, $read:ident, $write:ident) => {
        impl Word for $ty {
            const WIDTH: usize = core::mem::size_of::<$ty>();

            fn load<M: MappedMemory + ?Sized>(mem: &M, offset: usize) -> Self {
                if is_aligned(mem.address().wrapping_add(offset), Self::WIDTH) {
                    return mem.$read(offset);
                }
                let mut bytes = [0u8; core::mem::size_of::<$ty>()];
                for (i, b) in bytes.iter_mut().enumerate() {
                    *b = mem.read_u8(offset + i);
                }
                <$ty>::from_ne_bytes(bytes)
            }

            fn store<M: MappedMemory + ?Sized>(mem: &mut M, offset: usize, value: Self) {
                if is_aligned(mem.address().wrapping_add(offset), Self::WIDTH) {
                    return mem.$write(offset, value);
                }
                for (i, b) in value.to_ne_bytes().into_iter().enumerate() {
                    mem.write_u8(offset + i, b);
                }
            }
        }
    };
}

impl_word!(u16, read_u16, write_u16);
impl_word!(u32, read_u32, write_u32);
