//! Bounds-checked access to the mapped device.
//!
//! Every operation validates the range, waits for the controller to go
//! idle, copies, and finishes with a barrier so the data is visible on the
//! bus before returning. Offsets are byte offsets from the device base.

use embedded_hal::delay::DelayNs;

use crate::controller::{SdramController, TimingRegister};
use crate::dram::Sdram;
use crate::error::Error;
use crate::geometry::check_range;
use crate::memory::{is_aligned, Barrier, MappedMemory, Word};

impl<C, R, M, D, B> Sdram<C, R, M, D, B>
where
    C: SdramController,
    R: TimingRegister,
    M: MappedMemory,
    D: DelayNs,
    B: Barrier,
{
    /// Copy `buf` to the device at `offset`.
    pub fn write_buffer(&mut self, buf: &[u8], offset: u32) -> Result<(), Error> {
        self.write_words(buf, offset)
    }

    /// Fill `buf` from the device at `offset`.
    pub fn read_buffer(&mut self, buf: &mut [u8], offset: u32) -> Result<(), Error> {
        self.read_words(buf, offset)
    }

    pub fn write_buffer16(&mut self, buf: &[u16], offset: u32) -> Result<(), Error> {
        self.write_words(buf, offset)
    }

    pub fn read_buffer16(&mut self, buf: &mut [u16], offset: u32) -> Result<(), Error> {
        self.read_words(buf, offset)
    }

    pub fn write_buffer32(&mut self, buf: &[u32], offset: u32) -> Result<(), Error> {
        self.write_words(buf, offset)
    }

    pub fn read_buffer32(&mut self, buf: &mut [u32], offset: u32) -> Result<(), Error> {
        self.read_words(buf, offset)
    }

    /// Set `count` bytes at `offset` to `value`.
    pub fn fill_buffer(&mut self, offset: u32, count: u32, value: u8) -> Result<(), Error> {
        let start = self.prepare(offset, count as usize, 1)?;
        self.memory_mut().fill(start, count as usize, value);
        self.barrier_mut().barrier();
        Ok(())
    }

    /// Set `count` halfwords at `offset` to `value`.
    pub fn fill_buffer16(&mut self, offset: u32, count: u32, value: u16) -> Result<(), Error> {
        self.fill_words(offset, count, value)
    }

    /// Set `count` words at `offset` to `value`.
    pub fn fill_buffer32(&mut self, offset: u32, count: u32, value: u32) -> Result<(), Error> {
        self.fill_words(offset, count, value)
    }

    /// Validate `count` elements of `width` bytes at `offset` and wait for
    /// the device. Returns the window offset to start at.
    fn prepare(&mut self, offset: u32, count: usize, width: usize) -> Result<usize, Error> {
        if count == 0 {
            return Err(Error::InvalidParameter);
        }
        let size = count
            .checked_mul(width)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(Error::InvalidParameter)?;
        check_range(offset, size)?;
        self.wait_ready()?;
        Ok(offset as usize)
    }

    /// Both ends aligned: one contiguous copy is equivalent to the element loop.
    fn contiguous<W: Word>(&self, start: usize, buf: *const W) -> bool {
        is_aligned(self.memory().address().wrapping_add(start), W::WIDTH)
            && is_aligned(buf as usize, W::WIDTH)
    }

    fn write_words<W: Word>(&mut self, buf: &[W], offset: u32) -> Result<(), Error> {
        let start = self.prepare(offset, buf.len(), W::WIDTH)?;
        if self.contiguous(start, buf.as_ptr()) {
            self.memory_mut().write(start, W::as_bytes(buf));
        } else {
            let mem = self.memory_mut();
            for (i, &word) in buf.iter().enumerate() {
                W::store(mem, start + i * W::WIDTH, word);
            }
        }
        self.barrier_mut().barrier();
        Ok(())
    }

    fn read_words<W: Word>(&mut self, buf: &mut [W], offset: u32) -> Result<(), Error> {
        let start = self.prepare(offset, buf.len(), W::WIDTH)?;
        if self.contiguous(start, buf.as_ptr()) {
            self.memory().read(start, W::as_bytes_mut(buf));
        } else {
            let mem = self.memory();
            for (i, word) in buf.iter_mut().enumerate() {
                *word = W::load(mem, start + i * W::WIDTH);
            }
        }
        self.barrier_mut().barrier();
        Ok(())
    }

    fn fill_words<W: Word>(&mut self, offset: u32, count: u32, value: W) -> Result<(), Error> {
        let start = self.prepare(offset, count as usize, W::WIDTH)?;
        let mem = self.memory_mut();
        for i in 0..count as usize {
            W::store(mem, start + i * W::WIDTH, value);
        }
        self.barrier_mut().barrier();
        Ok(())
    }
}
