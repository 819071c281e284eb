//! SPI device sessions
//!
//! A [`SpiSession`] owns one open transport handle and translates the
//! caller's [`ConnectionSettings`] into wire behavior. When the caller asks
//! for LSB-first framing, every byte is bit-reversed on its way out and on
//! its way in, since transports shift MSB-first.
//!
//! # Usage contract
//!
//! Sessions are synchronous: every call runs to completion on the calling
//! thread. A session is not meant to be shared between threads; sessions
//! over different devices are fully independent.

use alloc::vec;
use alloc::vec::Vec;

use crate::bits::{reverse_bits, reverse_bits_in_place};
use crate::bus::{BusDescriptor, NativeConnectionDescriptor, SpiBusProvider, SpiTransport};
use crate::error::{Error, Result};
use crate::settings::{ChipSelectActiveState, ConnectionSettings, DataFlow};

/// Capability interface of an open SPI device
pub trait SpiDevice {
    /// Copy of the settings the device was opened with
    fn connection_settings(&self) -> ConnectionSettings;

    /// Read a single byte
    fn read_byte(&mut self) -> Result<u8>;

    /// Fill `buf` (must not be empty)
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Write a single byte
    fn write_byte(&mut self, value: u8) -> Result<()>;

    /// Write all of `data`
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Simultaneously write `write_buf` and read into `read_buf`
    ///
    /// Both buffers must have the same length.
    fn transfer_full_duplex(&mut self, write_buf: &[u8], read_buf: &mut [u8]) -> Result<()>;

    /// Release the device; later calls are no-ops
    fn close(&mut self) -> Result<()>;
}

enum SessionState<T> {
    Open(T),
    Closed,
}

/// An open session with one SPI device
pub struct SpiSession<T: SpiTransport> {
    state: SessionState<T>,
    settings: ConnectionSettings,
    bus: BusDescriptor,
    chip_select: u32,
    invert_bit_order: bool,
}

impl<T: SpiTransport> SpiSession<T> {
    /// Validate `settings`, locate the bus and open the device
    ///
    /// Steps, in order:
    /// 1. Only active-low chip select is accepted
    /// 2. LSB-first data flow turns on bit-order inversion
    /// 3. The [`NO_CHIP_SELECT`](crate::NO_CHIP_SELECT) sentinel resolves to line 0
    /// 4. The SPI mode is translated to native mode bits
    /// 5. Buses are enumerated by friendly name (`SPI<id>`)
    /// 6. The first match is opened
    pub fn open<P>(provider: &P, settings: &ConnectionSettings) -> Result<Self>
    where
        P: SpiBusProvider<Transport = T> + ?Sized,
    {
        if settings.chip_select_active_state != ChipSelectActiveState::Low {
            log::error!(
                "spi_session: Chip select active state {:?} is not supported (only Low)",
                settings.chip_select_active_state
            );
            return Err(Error::UnsupportedConfiguration);
        }

        let invert_bit_order = settings.data_flow == DataFlow::LsbFirst;

        let chip_select = match settings.effective_chip_select_line() {
            Some(line) => line,
            None => {
                log::error!(
                    "spi_session: Invalid chip select line {}",
                    settings.chip_select_line
                );
                return Err(Error::UnsupportedConfiguration);
            }
        };

        if settings.data_bit_length == 0 {
            log::error!("spi_session: Data bit length must be non-zero");
            return Err(Error::UnsupportedConfiguration);
        }

        let native = NativeConnectionDescriptor {
            chip_select,
            mode: settings.mode.native(),
            bits_per_word: settings.data_bit_length,
            clock_hz: settings.clock_frequency,
        };

        let name = settings.bus_id.friendly_name();
        log::debug!("spi_session: Looking up bus {}", name);

        let buses = provider.find_buses(&name)?;
        let bus = match buses.into_iter().next() {
            Some(bus) => bus,
            None => {
                log::error!("spi_session: No bus named {}", name);
                return Err(Error::DeviceNotFound);
            }
        };

        let transport = match provider.open_device(&bus, &native)? {
            Some(transport) => transport,
            None => {
                log::error!(
                    "spi_session: Failed to open {} chip select {}",
                    bus.name,
                    chip_select
                );
                return Err(Error::TransportOpenFailed);
            }
        };

        log::info!(
            "spi_session: Opened {} cs={} (mode={}, bits={}, speed={} kHz, {:?})",
            bus.name,
            chip_select,
            settings.mode.as_u8(),
            settings.data_bit_length,
            settings.clock_frequency / 1000,
            settings.data_flow
        );

        Ok(Self {
            state: SessionState::Open(transport),
            settings: settings.clone(),
            bus,
            chip_select,
            invert_bit_order,
        })
    }

    /// Whether bytes are bit-reversed on the way in and out
    pub fn bit_order_inversion_needed(&self) -> bool {
        self.invert_bit_order
    }

    /// Chip-select line actually addressed on the transport
    pub fn effective_chip_select_line(&self) -> u32 {
        self.chip_select
    }

    /// The bus this session was opened on
    pub fn bus(&self) -> &BusDescriptor {
        &self.bus
    }

    /// Whether [`close`](SpiDevice::close) has been called
    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    fn transport(&mut self) -> Result<&mut T> {
        match &mut self.state {
            SessionState::Open(transport) => Ok(transport),
            SessionState::Closed => Err(Error::SessionClosed),
        }
    }

    /// Copy of `data`, bit-reversed if needed
    fn outgoing(&self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        if self.invert_bit_order {
            reverse_bits_in_place(&mut out);
        }
        out
    }
}

impl<T: SpiTransport> SpiDevice for SpiSession<T> {
    fn connection_settings(&self) -> ConnectionSettings {
        self.settings.clone()
    }

    fn read_byte(&mut self) -> Result<u8> {
        let invert = self.invert_bit_order;
        let mut byte = [0u8; 1];
        self.transport()?.read(&mut byte)?;
        log::trace!("spi_session: read_byte 0x{:02X}", byte[0]);

        Ok(if invert {
            reverse_bits(byte[0])
        } else {
            byte[0]
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let invert = self.invert_bit_order;
        let transport = self.transport()?;
        if buf.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let mut staging = vec![0u8; buf.len()];
        transport.read(&mut staging)?;
        log::trace!("spi_session: read {} bytes", staging.len());

        buf.copy_from_slice(&staging);
        if invert {
            reverse_bits_in_place(buf);
        }
        Ok(())
    }

    fn write_byte(&mut self, value: u8) -> Result<()> {
        let byte = if self.invert_bit_order {
            reverse_bits(value)
        } else {
            value
        };
        log::trace!("spi_session: write_byte 0x{:02X}", byte);
        self.transport()?.write(&[byte])
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.transport()?;
        let out = self.outgoing(data);
        log::trace!("spi_session: write {} bytes", out.len());
        self.transport()?.write(&out)
    }

    fn transfer_full_duplex(&mut self, write_buf: &[u8], read_buf: &mut [u8]) -> Result<()> {
        self.transport()?;
        if write_buf.len() != read_buf.len() {
            log::error!(
                "spi_session: Duplex buffers differ in length ({} vs {})",
                write_buf.len(),
                read_buf.len()
            );
            return Err(Error::InvalidArgument);
        }

        let out = self.outgoing(write_buf);
        let mut incoming = vec![0u8; out.len()];
        self.transport()?.transfer_full_duplex(&out, &mut incoming)?;
        log::trace!("spi_session: transferred {} bytes", incoming.len());

        read_buf.copy_from_slice(&incoming);
        if self.invert_bit_order {
            reverse_bits_in_place(read_buf);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match core::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(mut transport) => {
                log::info!(
                    "spi_session: Closing {} cs={}",
                    self.bus.name,
                    self.chip_select
                );
                transport.close()
            }
            SessionState::Closed => Ok(()),
        }
    }
}

impl<T: SpiTransport> Drop for SpiSession<T> {
    fn drop(&mut self) {
        if let Err(e) = SpiDevice::close(self) {
            log::warn!("spi_session: Error closing {}: {}", self.bus.name, e);
        }
    }
}

impl<T: SpiTransport> embedded_io::ErrorType for SpiSession<T> {
    type Error = Error;
}

impl<T: SpiTransport> embedded_io::Read for SpiSession<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        SpiDevice::read(self, buf)?;
        Ok(buf.len())
    }
}

impl<T: SpiTransport> embedded_io::Write for SpiSession<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        SpiDevice::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.transport().map(|_| ())
    }
}
