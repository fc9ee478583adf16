//! External memory controller interface.
//!
//! The driver never programs controller registers directly except for the
//! CAS field of the SDRAM control register, which it has to keep in step
//! with the DRAM mode register. Everything else goes through
//! [`SdramController`], which the platform implements on top of its own
//! controller HAL.

use core::fmt::Debug;

/// Controller command modes, in controller encoding order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandMode {
    Normal = 0,
    ClockEnable = 1,
    PrechargeAll = 2,
    AutoRefresh = 3,
    LoadMode = 4,
    SelfRefresh = 5,
    PowerDown = 6,
}

impl CommandMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandMode::Normal => "Normal Mode",
            CommandMode::ClockEnable => "Clock Enable",
            CommandMode::PrechargeAll => "Precharge All",
            CommandMode::AutoRefresh => "Auto Refresh",
            CommandMode::LoadMode => "Load Mode Register",
            CommandMode::SelfRefresh => "Self Refresh",
            CommandMode::PowerDown => "Power Down",
        }
    }
}

/// Controller SDRAM bank a command is addressed to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandTarget {
    #[default]
    Bank1,
    Bank2,
    Both,
}

/// One controller command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub mode: CommandMode,
    pub target: CommandTarget,
    /// Consecutive auto-refresh cycles issued by an auto-refresh command.
    pub auto_refresh_number: u32,
    /// Mode register payload of a load-mode-register command.
    pub mode_register: u32,
}

impl Command {
    pub const fn new(mode: CommandMode, target: CommandTarget) -> Self {
        Self {
            mode,
            target,
            auto_refresh_number: 1,
            mode_register: 0,
        }
    }

    pub const fn auto_refresh(target: CommandTarget, cycles: u32) -> Self {
        Self {
            auto_refresh_number: cycles,
            ..Self::new(CommandMode::AutoRefresh, target)
        }
    }

    pub const fn load_mode(target: CommandTarget, payload: u32) -> Self {
        Self {
            mode_register: payload,
            ..Self::new(CommandMode::LoadMode, target)
        }
    }
}

/// Command path of the external memory controller.
pub trait SdramController {
    type Error: Debug;

    /// Submit `command` and block until the controller accepts it, or until
    /// `timeout` ticks have elapsed.
    fn send_command(&mut self, command: &Command, timeout: u32) -> Result<(), Self::Error>;

    /// `true` while the controller is busy with the device.
    fn is_busy(&self) -> bool;

    /// Program the auto-refresh timer.
    fn program_refresh_rate(&mut self, count: u32) -> Result<(), Self::Error>;

    /// CAS latency, in clock cycles, the controller's timing was configured
    /// with. This is the electrical timing the controller enforces.
    fn cas_latency(&self) -> u8;
}

impl<T: SdramController + ?Sized> SdramController for &mut T {
    type Error = T::Error;

    fn send_command(&mut self, command: &Command, timeout: u32) -> Result<(), Self::Error> {
        T::send_command(self, command, timeout)
    }

    fn is_busy(&self) -> bool {
        T::is_busy(self)
    }

    fn program_refresh_rate(&mut self, count: u32) -> Result<(), Self::Error> {
        T::program_refresh_rate(self, count)
    }

    fn cas_latency(&self) -> u8 {
        T::cas_latency(self)
    }
}

// ============================================================================
// SDRAM control register (CAS field)
// ============================================================================
const SDCR_CAS_POS: u32 = 3;
const SDCR_CAS_MASK: u32 = 0x3 << SDCR_CAS_POS;

/// Raw access to the controller's SDRAM control register.
pub trait TimingRegister {
    fn read(&self) -> u32;

    fn write(&mut self, value: u32);

    /// Controller CAS encoding, bits 4:3.
    fn cas_field(&self) -> u32 {
        (self.read() & SDCR_CAS_MASK) >> SDCR_CAS_POS
    }

    /// Replace bits 4:3, keeping every other bit of the register.
    fn set_cas_field(&mut self, cas: u32) {
        let val = (self.read() & !SDCR_CAS_MASK) | ((cas << SDCR_CAS_POS) & SDCR_CAS_MASK);
        self.write(val);
    }
}

impl<T: TimingRegister + ?Sized> TimingRegister for &mut T {
    fn read(&self) -> u32 {
        T::read(self)
    }

    fn write(&mut self, value: u32) {
        T::write(self, value)
    }
}

/// Controller CAS encoding matching a mode register CAS code.
///
/// Unknown codes fall back to CAS 3, the slowest latency the device
/// supports.
pub const fn controller_cas_for(mode_cas_code: u16) -> u32 {
    match mode_cas_code {
        1 => 1,
        2 => 2,
        3 => 3,
        _ => 3,
    }
}

/// SDRAM control register 1 of the STM32H7 FMC (block at 0x5200_4000).
pub const FMC_SDCR1: usize = 0x5200_4140;

/// SDRAM control register 1 of the STM32F4/F7 FMC (block at 0xA000_0000).
pub const FMC_SDCR1_F4_F7: usize = 0xA000_0140;

/// Control register accessed with volatile reads and writes.
pub struct MmioTimingRegister {
    addr: usize,
}

impl MmioTimingRegister {
    /// # Safety
    ///
    /// `addr` must be the address of the controller's SDRAM control
    /// register, and nothing else may write it while this value exists.
    pub const unsafe fn new(addr: usize) -> Self {
        Self { addr }
    }
}

impl TimingRegister for MmioTimingRegister {
    #[inline(always)]
    fn read(&self) -> u32 {
        unsafe { core::ptr::read_volatile(self.addr as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, value: u32) {
        unsafe { core::ptr::write_volatile(self.addr as *mut u32, value) }
    }
}
