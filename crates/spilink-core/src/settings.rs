//! Connection settings
//!
//! [`ConnectionSettings`] is the portable description of how to talk to a
//! device: which bus and chip-select line, which clock mode and speed, and
//! which bit order the caller expects on the wire.

use alloc::format;
use alloc::string::{String, ToString};
use bitflags::bitflags;

use crate::error::{Error, Result};

/// Chip-select sentinel meaning "do not manage a chip-select line"
///
/// The session still addresses line 0 on the transport in that case.
pub const NO_CHIP_SELECT: i32 = -1;

/// Default SPI clock speed in Hz (500 kHz)
const DEFAULT_CLOCK_HZ: u32 = 500_000;

/// Default word size in bits
const DEFAULT_BITS_PER_WORD: u8 = 8;

/// Identifier of a physical SPI bus
///
/// Either numeric (`0`, `1`, ...) or an arbitrary controller name. Numeric
/// identifiers enumerate under the friendly name `SPI<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusId(String);

impl BusId {
    /// Create a bus identifier from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name used for bus enumeration
    pub fn friendly_name(&self) -> String {
        match self.0.parse::<u32>() {
            Ok(n) => format!("SPI{}", n),
            Err(_) => self.0.clone(),
        }
    }
}

impl From<u32> for BusId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for BusId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for BusId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BusId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical level that asserts chip select
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChipSelectActiveState {
    /// Chip select is asserted by driving the line low
    #[default]
    Low,
    /// Chip select is asserted by driving the line high (not supported)
    High,
}

/// Bit order on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataFlow {
    /// Most significant bit first
    #[default]
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

bitflags! {
    /// Native SPI mode bits as understood by the platform transport
    ///
    /// Bit values follow the Linux spidev convention.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u8 {
        /// Clock phase: sample on the trailing edge
        const CPHA = 0x01;
        /// Clock polarity: clock idles high
        const CPOL = 0x02;
    }
}

/// SPI clock polarity/phase mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Every portable mode, in numeric order
    pub const ALL: [SpiMode; 4] = [Self::Mode0, Self::Mode1, Self::Mode2, Self::Mode3];

    /// Translate to the native mode bits
    pub const fn native(&self) -> ModeFlags {
        match self {
            Self::Mode0 => ModeFlags::empty(),
            Self::Mode1 => ModeFlags::CPHA,
            Self::Mode2 => ModeFlags::CPOL,
            Self::Mode3 => ModeFlags::CPOL.union(ModeFlags::CPHA),
        }
    }

    /// Numeric mode (0-3)
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Mode0 => 0,
            Self::Mode1 => 1,
            Self::Mode2 => 2,
            Self::Mode3 => 3,
        }
    }
}

impl TryFrom<u8> for SpiMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Mode0),
            1 => Ok(Self::Mode1),
            2 => Ok(Self::Mode2),
            3 => Ok(Self::Mode3),
            _ => {
                log::debug!("spi_session: SPI mode {} is not 0-3", value);
                Err(Error::UnsupportedConfiguration)
            }
        }
    }
}

/// Portable settings used to open an SPI session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionSettings {
    /// Which physical bus to open
    pub bus_id: BusId,
    /// Chip-select line, or [`NO_CHIP_SELECT`]
    pub chip_select_line: i32,
    /// Level that asserts chip select
    pub chip_select_active_state: ChipSelectActiveState,
    /// Clock polarity/phase
    pub mode: SpiMode,
    /// Word size in bits
    pub data_bit_length: u8,
    /// Requested clock rate in Hz
    pub clock_frequency: u32,
    /// Bit order the caller expects on the wire
    pub data_flow: DataFlow,
}

impl ConnectionSettings {
    /// Create settings for the given bus with chip-select line 0 and
    /// default parameters (mode 0, 8-bit words, 500 kHz, MSB first)
    pub fn new(bus_id: impl Into<BusId>) -> Self {
        Self {
            bus_id: bus_id.into(),
            chip_select_line: 0,
            chip_select_active_state: ChipSelectActiveState::Low,
            mode: SpiMode::Mode0,
            data_bit_length: DEFAULT_BITS_PER_WORD,
            clock_frequency: DEFAULT_CLOCK_HZ,
            data_flow: DataFlow::MsbFirst,
        }
    }

    /// Set the chip-select line
    pub fn with_chip_select_line(mut self, line: i32) -> Self {
        self.chip_select_line = line;
        self
    }

    /// Set the chip-select active level
    pub fn with_chip_select_active_state(mut self, state: ChipSelectActiveState) -> Self {
        self.chip_select_active_state = state;
        self
    }

    /// Set the SPI mode
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the word size in bits
    pub fn with_data_bit_length(mut self, bits: u8) -> Self {
        self.data_bit_length = bits;
        self
    }

    /// Set the clock rate in Hz
    pub fn with_clock_frequency(mut self, hz: u32) -> Self {
        self.clock_frequency = hz;
        self
    }

    /// Set the bit order
    pub fn with_data_flow(mut self, flow: DataFlow) -> Self {
        self.data_flow = flow;
        self
    }

    /// Chip-select line used to address the transport
    ///
    /// The [`NO_CHIP_SELECT`] sentinel resolves to line 0. Returns `None`
    /// for any other negative line.
    pub fn effective_chip_select_line(&self) -> Option<u32> {
        if self.chip_select_line == NO_CHIP_SELECT {
            Some(0)
        } else {
            u32::try_from(self.chip_select_line).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_name() {
        assert_eq!(BusId::from(0u32).friendly_name(), "SPI0");
        assert_eq!(BusId::from("3").friendly_name(), "SPI3");
        assert_eq!(BusId::from("SPI1").friendly_name(), "SPI1");
        assert_eq!(BusId::from("ctrl-a").friendly_name(), "ctrl-a");
    }

    #[test]
    fn test_mode_mapping_is_distinct() {
        let native: alloc::vec::Vec<ModeFlags> = SpiMode::ALL.iter().map(|m| m.native()).collect();
        for (i, a) in native.iter().enumerate() {
            for b in &native[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(SpiMode::Mode0.native().bits(), 0);
        assert_eq!(SpiMode::Mode1.native().bits(), 1);
        assert_eq!(SpiMode::Mode2.native().bits(), 2);
        assert_eq!(SpiMode::Mode3.native().bits(), 3);
    }

    #[test]
    fn test_mode_from_u8() {
        for mode in SpiMode::ALL {
            assert_eq!(SpiMode::try_from(mode.as_u8()), Ok(mode));
        }
        assert_eq!(SpiMode::try_from(4u8), Err(Error::UnsupportedConfiguration));
        assert_eq!(SpiMode::try_from(0xFFu8), Err(Error::UnsupportedConfiguration));
    }

    #[test]
    fn test_effective_chip_select() {
        let settings = ConnectionSettings::new(0u32);
        assert_eq!(settings.effective_chip_select_line(), Some(0));

        let settings = settings.with_chip_select_line(NO_CHIP_SELECT);
        assert_eq!(settings.effective_chip_select_line(), Some(0));
        assert_eq!(settings.chip_select_line, -1);

        let settings = settings.with_chip_select_line(2);
        assert_eq!(settings.effective_chip_select_line(), Some(2));

        let settings = settings.with_chip_select_line(-2);
        assert_eq!(settings.effective_chip_select_line(), None);
        let settings = settings.with_chip_select_line(i32::MIN);
        assert_eq!(settings.effective_chip_select_line(), None);
    }

    #[test]
    fn test_defaults() {
        let settings = ConnectionSettings::new("SPI2");
        assert_eq!(settings.chip_select_active_state, ChipSelectActiveState::Low);
        assert_eq!(settings.mode, SpiMode::Mode0);
        assert_eq!(settings.data_bit_length, 8);
        assert_eq!(settings.data_flow, DataFlow::MsbFirst);
    }
}
