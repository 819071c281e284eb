//! spilink-core - Portable SPI device sessions
//!
//! This crate turns a portable [`ConnectionSettings`] value into an open
//! [`SpiSession`] over a platform transport, and then performs byte-oriented
//! read, write and full-duplex transfers on it. Bus enumeration and the
//! actual wire access are delegated to a [`SpiBusProvider`] implementation
//! supplied by a backend crate (Linux spidev, in-memory dummy, ...).
//!
//! It is `no_std` compatible but requires an allocator.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for the core error type
//!
//! # Example
//!
//! ```ignore
//! use spilink_core::{ConnectionSettings, DataFlow, SpiMode, SpiSession};
//!
//! let settings = ConnectionSettings::new(0u32)
//!     .with_mode(SpiMode::Mode3)
//!     .with_clock_frequency(1_000_000)
//!     .with_data_flow(DataFlow::LsbFirst);
//!
//! let mut session = SpiSession::open(&provider, &settings)?;
//! session.write(&[0x9F])?;
//! let id = session.read_byte()?;
//! session.close()?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bits;
pub mod bus;
pub mod error;
pub mod session;
pub mod settings;

pub use bits::{reverse_bits, reverse_bits_in_place};
pub use bus::{BusDescriptor, NativeConnectionDescriptor, SpiBusProvider, SpiTransport};
pub use error::{Error, Result};
pub use session::{SpiDevice, SpiSession};
pub use settings::{
    BusId, ChipSelectActiveState, ConnectionSettings, DataFlow, ModeFlags, SpiMode,
    NO_CHIP_SELECT,
};
