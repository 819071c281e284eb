//! spilink-linux-spi - Linux spidev support
//!
//! This crate provides a [`SpiBusProvider`](spilink_core::SpiBusProvider)
//! for Linux, using the `/dev/spidevX.Y` device interface.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! Bus X is enumerated under the friendly name `SPIX`.
//!
//! # Example
//!
//! ```no_run
//! use spilink_core::{ConnectionSettings, SpiDevice, SpiMode, SpiSession};
//! use spilink_linux_spi::{LinuxSpiBus, LinuxSpiConfig};
//!
//! let bus = LinuxSpiBus::new(LinuxSpiConfig::default());
//!
//! // Opens /dev/spidev0.1
//! let settings = ConnectionSettings::new(0u32)
//!     .with_chip_select_line(1)
//!     .with_mode(SpiMode::Mode3)
//!     .with_clock_frequency(4_000_000);
//! let mut spi = SpiSession::open(&bus, &settings)?;
//!
//! let mut id = [0u8; 3];
//! spi.transfer_full_duplex(&[0x9F, 0x00, 0x00], &mut id)?;
//! spi.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxSpiBus, LinuxSpiConfig, LinuxSpiDevice};
pub use error::{LinuxSpiError, Result};
