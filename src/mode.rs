//! SDRAM mode register.
//!
//! ```text
//!  9        8..7       6..4        3           2..0
//! +--------+----------+-----------+-----------+--------------+
//! | WB     | op mode  | CAS lat.  | burst type| burst length |
//! +--------+----------+-----------+-----------+--------------+
//! ```

use core::fmt;

const BURST_LENGTH_MASK: u16 = 0x7;
const BURST_TYPE_POS: u16 = 3;
const CAS_LATENCY_POS: u16 = 4;
const CAS_LATENCY_MASK: u16 = 0x7;
const OPERATING_MODE_POS: u16 = 7;
const OPERATING_MODE_MASK: u16 = 0x3;
const WRITE_BURST_MODE_POS: u16 = 9;
const FIELD_MASK: u16 = 0x03FF;

/// Burst length (bits 2..0)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum BurstLength {
    One = 0,
    Two = 1,
    #[default]
    Four = 2,
    Eight = 3,
    FullPage = 7,
}

impl BurstLength {
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(BurstLength::One),
            1 => Some(BurstLength::Two),
            2 => Some(BurstLength::Four),
            3 => Some(BurstLength::Eight),
            7 => Some(BurstLength::FullPage),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BurstLength::One => "1",
            BurstLength::Two => "2",
            BurstLength::Four => "4",
            BurstLength::Eight => "8",
            BurstLength::FullPage => "Full Page",
        }
    }
}

/// Burst type (bit 3)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurstType {
    #[default]
    Sequential,
    Interleaved,
}

impl BurstType {
    pub const fn as_str(self) -> &'static str {
        match self {
            BurstType::Sequential => "Sequential",
            BurstType::Interleaved => "Interleaved",
        }
    }
}

/// CAS latency (bits 6..4). The W9825G6KH supports 2 and 3 clocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum CasLatency {
    Two = 2,
    #[default]
    Three = 3,
}

impl CasLatency {
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            2 => Some(CasLatency::Two),
            3 => Some(CasLatency::Three),
            _ => None,
        }
    }

    /// Latency in clock cycles.
    pub const fn cycles(self) -> u8 {
        self as u8
    }
}

/// Operating mode (bits 8..7). Only standard operation is defined; every
/// other encoding is reserved.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    #[default]
    Standard,
    Reserved(u8),
}

impl OperatingMode {
    pub const fn from_code(code: u16) -> Self {
        match code {
            0 => OperatingMode::Standard,
            c => OperatingMode::Reserved(c as u8),
        }
    }

    pub const fn code(self) -> u16 {
        match self {
            OperatingMode::Standard => 0,
            OperatingMode::Reserved(c) => c as u16 & OPERATING_MODE_MASK,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OperatingMode::Standard => "Standard",
            OperatingMode::Reserved(_) => "Reserved",
        }
    }
}

/// Write burst mode (bit 9)
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteBurstMode {
    /// Writes use the programmed burst length.
    Programmed,
    /// Writes access a single location.
    #[default]
    Single,
}

impl WriteBurstMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            WriteBurstMode::Programmed => "Programmed",
            WriteBurstMode::Single => "Single Location",
        }
    }
}

/// Packed mode register value, as sent with the load-mode-register command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeRegister(u16);

impl ModeRegister {
    pub const fn new(
        burst_length: BurstLength,
        burst_type: BurstType,
        cas_latency: CasLatency,
        operating_mode: OperatingMode,
        write_burst_mode: WriteBurstMode,
    ) -> Self {
        let bits = (burst_length as u16)
            | ((matches!(burst_type, BurstType::Interleaved) as u16) << BURST_TYPE_POS)
            | ((cas_latency as u16) << CAS_LATENCY_POS)
            | (operating_mode.code() << OPERATING_MODE_POS)
            | ((matches!(write_burst_mode, WriteBurstMode::Single) as u16) << WRITE_BURST_MODE_POS);
        Self(bits)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// `false` when any bit above the write burst mode bit is set.
    pub const fn is_defined(self) -> bool {
        self.0 & !FIELD_MASK == 0
    }

    pub const fn burst_length_code(self) -> u16 {
        self.0 & BURST_LENGTH_MASK
    }

    pub const fn cas_latency_code(self) -> u16 {
        (self.0 >> CAS_LATENCY_POS) & CAS_LATENCY_MASK
    }

    pub const fn operating_mode_code(self) -> u16 {
        (self.0 >> OPERATING_MODE_POS) & OPERATING_MODE_MASK
    }

    pub const fn burst_length(self) -> Option<BurstLength> {
        BurstLength::from_code(self.burst_length_code())
    }

    pub const fn burst_type(self) -> BurstType {
        if self.0 & (1 << BURST_TYPE_POS) != 0 {
            BurstType::Interleaved
        } else {
            BurstType::Sequential
        }
    }

    pub const fn cas_latency(self) -> Option<CasLatency> {
        CasLatency::from_code(self.cas_latency_code())
    }

    pub const fn operating_mode(self) -> OperatingMode {
        OperatingMode::from_code(self.operating_mode_code())
    }

    pub const fn write_burst_mode(self) -> WriteBurstMode {
        if self.0 & (1 << WRITE_BURST_MODE_POS) != 0 {
            WriteBurstMode::Single
        } else {
            WriteBurstMode::Programmed
        }
    }

    /// Bus payload for the load-mode-register command.
    pub const fn payload(self) -> u32 {
        self.0 as u32
    }

    /// Log the decoded fields.
    pub fn dump(self) {
        debug!("  Mode Register: {:#x}", self.0);
        debug!(
            "    Burst Length: {}",
            match self.burst_length() {
                Some(bl) => bl.as_str(),
                None => "Reserved",
            }
        );
        debug!("    Burst Type: {}", self.burst_type().as_str());
        debug!(
            "    CAS Latency: {}",
            match self.cas_latency() {
                Some(CasLatency::Two) => "2",
                Some(CasLatency::Three) => "3",
                None => "Reserved",
            }
        );
        debug!("    Operating Mode: {}", self.operating_mode().as_str());
        debug!("    Write Burst Mode: {}", self.write_burst_mode().as_str());
    }
}

impl fmt::Display for ModeRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} (BL ", self.0)?;
        match self.burst_length() {
            Some(bl) => f.write_str(bl.as_str())?,
            None => f.write_str("reserved")?,
        }
        write!(f, ", {}, CL ", self.burst_type().as_str())?;
        match self.cas_latency() {
            Some(cl) => write!(f, "{}", cl.cycles())?,
            None => f.write_str("reserved")?,
        }
        write!(
            f,
            ", {}, write burst {})",
            self.operating_mode().as_str(),
            self.write_burst_mode().as_str()
        )
    }
}
