//! Pattern-based memory test.

use embedded_hal::delay::DelayNs;

use crate::controller::{SdramController, TimingRegister};
use crate::dram::Sdram;
use crate::error::Error;
use crate::geometry::{check_range, GEOMETRY};
use crate::memory::{Barrier, MappedMemory, Word};

/// Fixed patterns, written and verified in this order before the
/// incremental pass.
pub const TEST_PATTERNS: [u32; 8] = [
    0x0000_0000, // all zeros
    0xFFFF_FFFF, // all ones
    0x5555_5555, // 01
    0xAAAA_AAAA, // 10
    0x3333_3333, // 0011
    0xCCCC_CCCC, // 1100
    0x0F0F_0F0F, // 00001111
    0xF0F0_F0F0, // 11110000
];

impl<C, R, M, D, B> Sdram<C, R, M, D, B>
where
    C: SdramController,
    R: TimingRegister,
    M: MappedMemory,
    D: DelayNs,
    B: Barrier,
{
    /// Destructive test of `size` bytes at `start`.
    ///
    /// `size / 4` words are covered; a trailing partial word is left alone.
    /// Each pattern is written over the whole range, then read back. The
    /// first pattern with any mismatch ends the test with
    /// [`Error::Mismatch`] describing its first bad word.
    pub fn memory_test(&mut self, start: u32, size: u32) -> Result<(), Error> {
        check_range(start, size)?;
        self.wait_ready()?;

        let base = start as usize;
        let words = (size / 4) as usize;
        info!("Running memory test ({} bytes, {} words)...", size, words);

        for pattern in TEST_PATTERNS {
            self.verify_pass(base, words, |_| pattern)?;
            debug!("  Pattern {:#x}: PASS", pattern);
        }

        self.verify_pass(base, words, |i| i as u32)?;
        debug!("  Incremental pattern: PASS");

        info!("Memory test completed successfully");
        Ok(())
    }

    /// Run [`Sdram::memory_test`] over `test_size` bytes at the start, the
    /// middle and the end of the device.
    pub fn run_diagnostics(&mut self, test_size: u32) -> Result<(), Error> {
        info!("=== SDRAM Diagnostics ===");
        self.dump_config()?;
        check_range(0, test_size)?;

        let last = (GEOMETRY.capacity - test_size) & !0x3;
        let middle = (last / 2) & !0x3;
        let mut previous = None;
        for start in [0, middle, last] {
            if previous == Some(start) {
                continue;
            }
            previous = Some(start);
            info!("Testing region at offset {:#x}", start);
            self.memory_test(start, test_size)?;
        }

        info!("=== Diagnostics PASSED ===");
        Ok(())
    }

    fn verify_pass(&mut self, base: usize, words: usize, pattern: impl Fn(usize) -> u32) -> Result<(), Error> {
        let mem = self.memory_mut();
        for i in 0..words {
            u32::store(mem, base + i * 4, pattern(i));
        }
        self.barrier_mut().barrier();

        let mem = self.memory();
        let mut errors = 0u32;
        let mut first = None;
        for i in 0..words {
            let expected = pattern(i);
            let actual = u32::load(mem, base + i * 4);
            if actual != expected {
                if first.is_none() {
                    error!("FAIL at word {} (expected {:#x}, got {:#x})", i, expected, actual);
                    first = Some(Error::Mismatch {
                        offset: (base + i * 4) as u32,
                        expected,
                        actual,
                    });
                }
                errors += 1;
            }
        }

        match first {
            None => Ok(()),
            Some(e) => {
                error!("  Total errors: {}", errors);
                Err(e)
            }
        }
    }
}
