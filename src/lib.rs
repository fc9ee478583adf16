#![cfg_attr(not(test), no_std)]

// This must go FIRST so that all the other modules see its macros.
mod debug;

pub mod controller;
pub mod dram;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod mode;
pub mod prelude;

mod access;
mod diag;

pub use crate::controller::{Command, CommandMode, CommandTarget, MmioTimingRegister, FMC_SDCR1, FMC_SDCR1_F4_F7};
pub use crate::diag::TEST_PATTERNS;
pub use crate::dram::{DeviceConfig, Sdram, INIT_AUTO_REFRESH_CYCLES};
pub use crate::error::{Error, StatusCode};
pub use crate::geometry::{calculate_refresh_rate, check_address, check_range, GEOMETRY};
pub use crate::memory::{Fence, Mmio};
pub use crate::mode::{BurstLength, BurstType, CasLatency, ModeRegister, OperatingMode, WriteBurstMode};
