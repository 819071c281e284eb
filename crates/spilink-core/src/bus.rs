//! Platform bus layer traits
//!
//! A backend crate provides bus enumeration and device opening through
//! [`SpiBusProvider`], and raw byte movement through [`SpiTransport`].
//! Both are blocking; any asynchronous plumbing the platform needs lives
//! behind these calls.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Result;
use crate::settings::ModeFlags;

/// A bus returned by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusDescriptor {
    /// Human-readable name (e.g. `SPI0`)
    pub name: String,
    /// Backend-specific identifier used to open a device on this bus
    pub id: String,
}

impl BusDescriptor {
    /// Create a new bus descriptor
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Platform-native parameters for opening a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeConnectionDescriptor {
    /// Chip-select line to address (sentinel already resolved)
    pub chip_select: u32,
    /// Native mode bits
    pub mode: ModeFlags,
    /// Word size in bits
    pub bits_per_word: u8,
    /// Clock rate in Hz
    pub clock_hz: u32,
}

/// An open handle to one SPI device
///
/// All transfers are exact-length: an implementation either moves every
/// requested byte or returns an error.
pub trait SpiTransport {
    /// Clock in `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Clock out all of `data`
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Clock out `tx` while clocking in `rx`
    ///
    /// Callers guarantee `tx.len() == rx.len()`.
    fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()>;

    /// Release the handle
    ///
    /// The session calls this at most once.
    fn close(&mut self) -> Result<()>;
}

/// Enumerates buses and opens devices on them
pub trait SpiBusProvider {
    /// Transport handle type produced by [`open_device`](Self::open_device)
    type Transport: SpiTransport;

    /// Enumerate every bus the platform knows about
    fn list_buses(&self) -> Result<Vec<BusDescriptor>>;

    /// Find buses matching a human-readable name (may return none)
    fn find_buses(&self, name_hint: &str) -> Result<Vec<BusDescriptor>>;

    /// Open a device on `bus`
    ///
    /// Returns `Ok(None)` when the platform hands out no handle.
    fn open_device(
        &self,
        bus: &BusDescriptor,
        native: &NativeConnectionDescriptor,
    ) -> Result<Option<Self::Transport>>;
}
