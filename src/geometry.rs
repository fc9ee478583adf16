//! Device geometry, address validation and refresh timing.
//!
//! - W9825G6KH: 32MB SDR SDRAM, 4 banks, 16-bit data bus
//! - Mapped at 0xC000_0000 (controller SDRAM bank 1)

use crate::error::Error;

/// Fixed organization of the attached DRAM.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeviceGeometry {
    /// Bus address of the first byte of the device.
    pub base: usize,
    /// Total size in bytes.
    pub capacity: u32,
    pub banks: u32,
    pub row_bits: u32,
    pub column_bits: u32,
    /// Width of one device word in bytes.
    pub word_bytes: u32,
    /// Bytes in one open row.
    pub page_size: u32,
}

impl DeviceGeometry {
    pub const fn rows(&self) -> u32 {
        1 << self.row_bits
    }

    pub const fn columns(&self) -> u32 {
        1 << self.column_bits
    }

    /// Bus address one past the last byte of the device.
    pub const fn end(&self) -> usize {
        self.base + self.capacity as usize
    }
}

pub const GEOMETRY: DeviceGeometry = DeviceGeometry {
    base: 0xC000_0000,
    capacity: 32 * 1024 * 1024,
    banks: 4,
    row_bits: 12,
    column_bits: 10,
    word_bytes: 2,
    page_size: (1 << 10) * 2,
};

const _: () = assert!(
    GEOMETRY.capacity == GEOMETRY.rows() * GEOMETRY.columns() * GEOMETRY.banks * GEOMETRY.word_bytes
);
const _: () = assert!(GEOMETRY.page_size == GEOMETRY.columns() * GEOMETRY.word_bytes);

/// Validate `size` bytes starting at device offset `offset`.
pub const fn check_range(offset: u32, size: u32) -> Result<(), Error> {
    if offset >= GEOMETRY.capacity || size == 0 {
        return Err(Error::InvalidParameter);
    }
    // offset < capacity, so the subtraction cannot wrap
    if size > GEOMETRY.capacity - offset {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}

/// Validate a single byte offset.
pub const fn check_address(offset: u32) -> Result<(), Error> {
    check_range(offset, 1)
}

/// Rounded auto-refresh count before the even adjustment.
///
/// `interval_ns = refresh_ms * 10^6 / rows`, then the count of clock cycles
/// in that interval, rounded to nearest.
pub const fn refresh_count(clock_mhz: u32, refresh_ms: u32) -> u32 {
    let interval_ns = refresh_ms as u64 * 1_000_000 / GEOMETRY.rows() as u64;
    let count = interval_ns.saturating_mul(clock_mhz as u64).saturating_add(500) / 1000;
    // clamp to the largest even value so the even adjustment cannot wrap
    if count >= u32::MAX as u64 {
        u32::MAX - 1
    } else {
        count as u32
    }
}

/// Auto-refresh timer value for the controller.
///
/// The controller only accepts even timer values, so an odd count is
/// rounded up. 100 MHz with a 64 ms refresh period gives 1563 cycles per
/// row, programmed as 1564.
pub const fn calculate_refresh_rate(clock_mhz: u32, refresh_ms: u32) -> u32 {
    let count = refresh_count(clock_mhz, refresh_ms);
    if count & 1 != 0 {
        count + 1
    } else {
        count
    }
}
