//! SDRAM bring-up driver for the Winbond W9825G6KH.
//!
//! - 32MB SDR SDRAM, 4 banks, 16-bit data bus
//! - Behind an FMC-style external memory controller, mapped at 0xC000_0000
//!
//! The controller's own timing configuration (set up by board support code
//! before [`Sdram::init`]) is authoritative for CAS latency: the mode
//! register is loaded with the controller's CAS setting, and the
//! controller's CAS field is patched afterwards if it still disagrees with
//! what the device latched. A mismatch between the two makes every read
//! return data from the wrong cycle.

use embedded_hal::delay::DelayNs;

use crate::controller::{controller_cas_for, Command, CommandMode, CommandTarget, SdramController, TimingRegister};
use crate::error::Error;
use crate::geometry::{calculate_refresh_rate, GEOMETRY};
use crate::memory::{Barrier, Fence, MappedMemory};
use crate::mode::{BurstLength, BurstType, CasLatency, ModeRegister, OperatingMode, WriteBurstMode};

// ============================================================================
// Timing parameters
// ============================================================================
/// Controller ticks allowed for a single command.
pub const COMMAND_TIMEOUT: u32 = 0xFFFF;

/// Stabilization time the device needs after clock enable.
pub const POWER_UP_DELAY_US: u32 = 100;
const POWER_UP_DELAY_MS: u32 = POWER_UP_DELAY_US.div_ceil(1000);

/// Auto-refresh cycles issued during init (datasheet minimum is 2).
pub const INIT_AUTO_REFRESH_CYCLES: u32 = 8;

const SETTLE_DELAY_MS: u32 = 10;

/// Poll interval of [`Sdram::wait_ready`].
pub const BUSY_POLL_MS: u32 = 1;

/// Polls before [`Sdram::wait_ready`] gives up.
pub const BUSY_TIMEOUT_TICKS: u32 = 1000;

// ============================================================================
// Public configuration
// ============================================================================

/// SDRAM configuration
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Controller bank the device sits on
    pub target: CommandTarget,
    pub burst_length: BurstLength,
    pub burst_type: BurstType,
    /// Requested CAS latency. Init loads the controller's CAS setting
    /// instead and stores that value back here.
    pub cas_latency: CasLatency,
    pub operating_mode: OperatingMode,
    pub write_burst_mode: WriteBurstMode,
    /// Auto-refresh timer value, see [`calculate_refresh_rate`]
    pub refresh_rate: u32,
}

impl Default for DeviceConfig {
    /// Bank 1, BL4 sequential, CL3, single-location writes, 100MHz / 64ms refresh.
    fn default() -> Self {
        Self {
            target: CommandTarget::Bank1,
            burst_length: BurstLength::Four,
            burst_type: BurstType::Sequential,
            cas_latency: CasLatency::Three,
            operating_mode: OperatingMode::Standard,
            write_burst_mode: WriteBurstMode::Single,
            refresh_rate: calculate_refresh_rate(100, 64),
        }
    }
}

impl DeviceConfig {
    /// Mode register described by this configuration.
    pub const fn mode_register(&self) -> ModeRegister {
        ModeRegister::new(
            self.burst_length,
            self.burst_type,
            self.cas_latency,
            self.operating_mode,
            self.write_burst_mode,
        )
    }

    fn validate(&self) -> Result<(), Error> {
        if !matches!(self.operating_mode, OperatingMode::Standard) || self.refresh_rate == 0 {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }
}

// ============================================================================
// Driver
// ============================================================================

/// W9825G6KH driver.
///
/// Owns the controller command path, the controller's SDRAM control
/// register, the mapped window, a delay source and a memory barrier. The
/// driver is attached once [`Sdram::init`] succeeds and detached again by
/// [`Sdram::deinit`]; every command and access operation fails while it is
/// detached.
pub struct Sdram<C, R, M, D, B = Fence> {
    controller: C,
    timing: R,
    memory: M,
    delay: D,
    barrier: B,
    config: Option<DeviceConfig>,
}

impl<C, R, M, D> Sdram<C, R, M, D, Fence> {
    /// Create a detached driver that orders window accesses with [`Fence`].
    pub fn new(controller: C, timing: R, memory: M, delay: D) -> Self {
        Self::with_barrier(controller, timing, memory, delay, Fence)
    }
}

impl<C, R, M, D, B> Sdram<C, R, M, D, B> {
    /// Create a detached driver with a platform barrier.
    pub fn with_barrier(controller: C, timing: R, memory: M, delay: D, barrier: B) -> Self {
        Self {
            controller,
            timing,
            memory,
            delay,
            barrier,
            config: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.config.is_some()
    }

    /// Configuration in effect, `None` while detached.
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Mode register value last loaded into the device.
    pub fn mode_register(&self) -> Option<ModeRegister> {
        self.config.as_ref().map(DeviceConfig::mode_register)
    }

    /// Device size in bytes.
    pub const fn capacity(&self) -> u32 {
        GEOMETRY.capacity
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn timing(&self) -> &R {
        &self.timing
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub(crate) fn barrier_mut(&mut self) -> &mut B {
        &mut self.barrier
    }

    /// Give back the collaborators. The device is left as it is.
    pub fn release(self) -> (C, R, M, D, B) {
        (self.controller, self.timing, self.memory, self.delay, self.barrier)
    }

    fn attached(&self) -> Result<&DeviceConfig, Error> {
        self.config.as_ref().ok_or(Error::NotAttached)
    }
}

impl<C, R, M, D, B> Sdram<C, R, M, D, B>
where
    C: SdramController,
    R: TimingRegister,
    M: MappedMemory,
    D: DelayNs,
    B: Barrier,
{
    /// Run the power-on sequence and attach the driver.
    ///
    /// Clock enable, power-up delay, precharge all, auto refresh, load mode
    /// register, CAS reconciliation, refresh timer. A failing step aborts
    /// the sequence and leaves the driver detached; call `init` again from
    /// scratch to retry.
    pub fn init(&mut self, config: DeviceConfig) -> Result<(), Error> {
        config.validate()?;
        self.config = None;
        let target = config.target;

        info!("=== SDRAM Initialization Started ===");

        // 1. Clock enable
        self.command(Command::new(CommandMode::ClockEnable, target))?;

        // 2. At least 100us before the first command after CKE
        self.delay.delay_ms(POWER_UP_DELAY_MS);

        // 3. Precharge all banks
        self.command(Command::new(CommandMode::PrechargeAll, target))?;

        // 4. Auto refresh
        self.command(Command::auto_refresh(target, INIT_AUTO_REFRESH_CYCLES))?;

        // 5. Load mode register, CAS latency from the controller
        let cas = match self.controller.cas_latency() {
            2 => CasLatency::Two,
            _ => CasLatency::Three,
        };
        if cas != config.cas_latency {
            warn!(
                "requested CAS {} replaced by controller CAS {}",
                config.cas_latency.cycles(),
                cas.cycles()
            );
        }
        let mode = ModeRegister::new(
            config.burst_length,
            config.burst_type,
            cas,
            config.operating_mode,
            config.write_burst_mode,
        );
        mode.dump();
        self.command(Command::load_mode(target, mode.payload()))?;

        // 6. Controller CAS must match what the device latched
        self.reconcile_cas(mode);

        // 7. Refresh timer
        debug!("Setting refresh rate to {}", config.refresh_rate);
        if self.controller.program_refresh_rate(config.refresh_rate).is_err() {
            error!("Set refresh rate failed");
            return Err(Error::RefreshRate);
        }

        self.delay.delay_ms(SETTLE_DELAY_MS);

        self.config = Some(DeviceConfig {
            cas_latency: cas,
            ..config
        });
        info!("=== SDRAM Initialization Complete ===");
        Ok(())
    }

    /// Detach the driver. A power-down command is attempted first; its
    /// failure is ignored. Calling this while detached does nothing.
    pub fn deinit(&mut self) -> Result<(), Error> {
        if let Some(config) = self.config.take() {
            if self
                .command(Command::new(CommandMode::PowerDown, config.target))
                .is_err()
            {
                warn!("power down failed, detaching anyway");
            }
            info!("SDRAM deinitialized");
        }
        Ok(())
    }

    /// Send a raw controller command.
    pub fn send_command(&mut self, command: &Command) -> Result<(), Error> {
        self.attached()?;
        self.command(*command)
    }

    /// Load the mode register directly and mirror its fields into the
    /// stored configuration.
    ///
    /// The controller's CAS field is left alone; keeping it in step is the
    /// caller's job here. Reserved encodings and bits above bit 9 are
    /// rejected before anything is sent.
    pub fn set_mode_register(&mut self, value: ModeRegister) -> Result<(), Error> {
        let config = *self.attached()?;
        if !value.is_defined() {
            return Err(Error::InvalidParameter);
        }
        let (Some(burst_length), Some(cas_latency), OperatingMode::Standard) =
            (value.burst_length(), value.cas_latency(), value.operating_mode())
        else {
            return Err(Error::InvalidParameter);
        };

        debug!("Setting mode register to: {:#x}", value.bits());
        value.dump();
        self.command(Command::load_mode(config.target, value.payload()))?;

        self.config = Some(DeviceConfig {
            burst_length,
            burst_type: value.burst_type(),
            cas_latency,
            write_burst_mode: value.write_burst_mode(),
            ..config
        });
        Ok(())
    }

    /// Reprogram the auto-refresh timer.
    pub fn set_refresh_rate(&mut self, count: u32) -> Result<(), Error> {
        let config = *self.attached()?;
        if count == 0 {
            return Err(Error::InvalidParameter);
        }
        self.controller
            .program_refresh_rate(count)
            .map_err(|_| Error::RefreshRate)?;
        self.config = Some(DeviceConfig {
            refresh_rate: count,
            ..config
        });
        Ok(())
    }

    /// Put the device into self refresh. Contents are retained with the
    /// controller clock stopped.
    pub fn enter_self_refresh(&mut self) -> Result<(), Error> {
        self.mode_command(CommandMode::SelfRefresh)
    }

    pub fn exit_self_refresh(&mut self) -> Result<(), Error> {
        self.mode_command(CommandMode::Normal)
    }

    pub fn enter_power_down(&mut self) -> Result<(), Error> {
        self.mode_command(CommandMode::PowerDown)
    }

    pub fn exit_power_down(&mut self) -> Result<(), Error> {
        self.mode_command(CommandMode::Normal)
    }

    /// Wait until the controller reports the device idle.
    ///
    /// Polls every [`BUSY_POLL_MS`] for at most [`BUSY_TIMEOUT_TICKS`]
    /// polls, blocking the caller meanwhile.
    pub fn wait_ready(&mut self) -> Result<(), Error> {
        self.attached()?;
        let mut ticks = 0;
        while self.controller.is_busy() {
            if ticks >= BUSY_TIMEOUT_TICKS {
                warn!("SDRAM busy for {} ms", ticks * BUSY_POLL_MS);
                return Err(Error::Timeout);
            }
            self.delay.delay_ms(BUSY_POLL_MS);
            ticks += 1;
        }
        Ok(())
    }

    /// Current device state without waiting.
    pub fn status(&self) -> Result<(), Error> {
        self.attached()?;
        if self.controller.is_busy() {
            return Err(Error::Busy);
        }
        Ok(())
    }

    /// Log the active configuration.
    pub fn dump_config(&self) -> Result<(), Error> {
        let config = self.attached()?;
        info!("SDRAM configuration:");
        info!("  Base: {:#x}, size: {} bytes", GEOMETRY.base, GEOMETRY.capacity);
        info!(
            "  Banks: {}, rows: {}, columns: {}",
            GEOMETRY.banks,
            GEOMETRY.rows(),
            GEOMETRY.columns()
        );
        info!("  Refresh rate: {}", config.refresh_rate);
        info!("  Controller CAS field: {}", self.timing.cas_field());
        config.mode_register().dump();
        Ok(())
    }

    fn mode_command(&mut self, mode: CommandMode) -> Result<(), Error> {
        let target = self.attached()?.target;
        self.command(Command::new(mode, target))
    }

    fn command(&mut self, command: Command) -> Result<(), Error> {
        trace!("{}", command.mode.as_str());
        self.controller
            .send_command(&command, COMMAND_TIMEOUT)
            .map_err(|_| {
                error!("{} failed", command.mode.as_str());
                Error::Command(command.mode)
            })
    }

    fn reconcile_cas(&mut self, mode: ModeRegister) {
        let current = self.timing.cas_field();
        let expected = controller_cas_for(mode.cas_latency_code());
        if current != expected {
            warn!("Patching controller CAS from {} to {}", current, expected);
            self.timing.set_cas_field(expected);
        } else {
            debug!("Controller CAS {} matches mode register", current);
        }
    }
}
