//! Collaborator traits, for glob import by board code.

pub use crate::controller::{SdramController, TimingRegister};
pub use crate::memory::{Barrier, MappedMemory};
pub use embedded_hal::delay::DelayNs;
