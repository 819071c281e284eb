//! spilink-dummy - In-memory SPI bus emulator for testing
//!
//! This crate provides a dummy bus provider that emulates SPI devices in
//! memory. Every transaction that reaches the "wire" is recorded, which
//! makes it useful for testing and development without real hardware.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use spilink_core::error::{Error, Result};
use spilink_core::{BusDescriptor, NativeConnectionDescriptor, SpiBusProvider, SpiTransport};

/// What the emulated device clocks back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyBehavior {
    /// Duplex transfers return what was sent; plain reads return 0xFF
    Echo,
    /// Every byte read is this value
    Fill(u8),
    /// Bytes are served from this queue, then 0xFF once it runs dry
    Scripted(VecDeque<u8>),
}

/// Configuration for the dummy bus
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Names reported by enumeration
    pub buses: Vec<String>,
    /// Device response behavior
    pub behavior: DummyBehavior,
    /// Make `open_device` hand out no handle
    pub refuse_open: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            buses: vec!["SPI0".into(), "SPI1".into()],
            behavior: DummyBehavior::Echo,
            refuse_open: false,
        }
    }
}

/// A single recorded bus event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// A device was opened
    Open {
        /// Bus name
        bus: String,
        /// Native parameters it was opened with
        native: NativeConnectionDescriptor,
    },
    /// Bytes clocked in
    Read(Vec<u8>),
    /// Bytes clocked out
    Write(Vec<u8>),
    /// Full-duplex exchange
    Duplex {
        /// Bytes clocked out
        tx: Vec<u8>,
        /// Bytes clocked in
        rx: Vec<u8>,
    },
    /// A device handle was released
    Close,
}

/// Shared record of everything that happened on the dummy bus
pub type DummyLog = Rc<RefCell<Vec<Transaction>>>;

/// Dummy SPI bus provider
pub struct DummyBus {
    config: DummyConfig,
    log: DummyLog,
}

impl DummyBus {
    /// Create a new dummy bus with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a new dummy bus with default configuration (SPI0 and SPI1, echo)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get a handle to the transaction log
    pub fn log(&self) -> DummyLog {
        self.log.clone()
    }

    /// Snapshot of all recorded transactions
    pub fn transactions(&self) -> Vec<Transaction> {
        self.log.borrow().clone()
    }

    /// Number of device handles released so far
    pub fn close_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|t| matches!(t, Transaction::Close))
            .count()
    }
}

impl SpiBusProvider for DummyBus {
    type Transport = DummyDevice;

    fn list_buses(&self) -> Result<Vec<BusDescriptor>> {
        Ok(self
            .config
            .buses
            .iter()
            .map(|name| BusDescriptor::new(name.clone(), name.clone()))
            .collect())
    }

    fn find_buses(&self, name_hint: &str) -> Result<Vec<BusDescriptor>> {
        let found: Vec<BusDescriptor> = self
            .list_buses()?
            .into_iter()
            .filter(|bus| bus.name.eq_ignore_ascii_case(name_hint))
            .collect();
        log::debug!("dummy: {} bus(es) match {}", found.len(), name_hint);
        Ok(found)
    }

    fn open_device(
        &self,
        bus: &BusDescriptor,
        native: &NativeConnectionDescriptor,
    ) -> Result<Option<DummyDevice>> {
        if self.config.refuse_open {
            log::debug!("dummy: Refusing to open {}", bus.name);
            return Ok(None);
        }

        self.log.borrow_mut().push(Transaction::Open {
            bus: bus.name.clone(),
            native: *native,
        });

        Ok(Some(DummyDevice {
            behavior: self.config.behavior.clone(),
            log: self.log.clone(),
        }))
    }
}

/// An open device on the dummy bus
pub struct DummyDevice {
    behavior: DummyBehavior,
    log: DummyLog,
}

impl DummyDevice {
    fn next_byte(&mut self) -> u8 {
        match &mut self.behavior {
            DummyBehavior::Echo => 0xFF,
            DummyBehavior::Fill(value) => *value,
            DummyBehavior::Scripted(queue) => queue.pop_front().unwrap_or(0xFF),
        }
    }
}

impl SpiTransport for DummyDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        for byte in buf.iter_mut() {
            *byte = self.next_byte();
        }
        self.log.borrow_mut().push(Transaction::Read(buf.to_vec()));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.log.borrow_mut().push(Transaction::Write(data.to_vec()));
        Ok(())
    }

    fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(Error::InvalidArgument);
        }

        if self.behavior == DummyBehavior::Echo {
            rx.copy_from_slice(tx);
        } else {
            for byte in rx.iter_mut() {
                *byte = self.next_byte();
            }
        }

        self.log.borrow_mut().push(Transaction::Duplex {
            tx: tx.to_vec(),
            rx: rx.to_vec(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Transaction::Close);
        Ok(())
    }
}

/// Parse backend options from a list of key-value pairs
///
/// - `buses=SPI0;SPI1` - bus names reported by enumeration
/// - `fill=<byte>` - answer every read with this byte (hex with `0x` or decimal)
/// - `script=<hex>` - answer reads from this byte sequence
/// - `refuse_open=1` - simulate a platform that hands out no handle
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "buses" => {
                config.buses = value
                    .split(';')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "fill" => {
                config.behavior = DummyBehavior::Fill(parse_byte(value)?);
            }
            "script" => {
                if value.len() % 2 != 0 {
                    return Err(format!(
                        "Invalid script value: {} (expected an even number of hex digits)",
                        value
                    ));
                }
                let bytes = value
                    .as_bytes()
                    .chunks(2)
                    .map(|pair| {
                        std::str::from_utf8(pair)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                            .ok_or_else(|| format!("Invalid script value: {}", value))
                    })
                    .collect::<std::result::Result<VecDeque<u8>, String>>()?;
                config.behavior = DummyBehavior::Scripted(bytes);
            }
            "refuse_open" => {
                config.refuse_open = matches!(*value, "1" | "true" | "yes");
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex byte: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid byte: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spilink_core::{
        ChipSelectActiveState, ConnectionSettings, DataFlow, ModeFlags, SpiDevice, SpiMode,
        SpiSession, NO_CHIP_SELECT,
    };

    #[test]
    fn test_end_to_end_scenario() {
        let bus = DummyBus::new_default();
        let settings = ConnectionSettings::new(0u32)
            .with_chip_select_line(NO_CHIP_SELECT)
            .with_chip_select_active_state(ChipSelectActiveState::Low)
            .with_mode(SpiMode::Mode0)
            .with_data_bit_length(8)
            .with_clock_frequency(1_000_000)
            .with_data_flow(DataFlow::MsbFirst);

        let mut session = SpiSession::open(&bus, &settings).unwrap();
        assert_eq!(session.bus().name, "SPI0");
        assert_eq!(session.effective_chip_select_line(), 0);
        assert!(!session.bit_order_inversion_needed());

        session.write(&[0xAA, 0x55]).unwrap();

        let mut read_buf = [0x00];
        session.transfer_full_duplex(&[0x0F], &mut read_buf).unwrap();
        assert_eq!(read_buf, [0x0F]);

        session.close().unwrap();

        assert_eq!(
            bus.transactions(),
            vec![
                Transaction::Open {
                    bus: "SPI0".into(),
                    native: NativeConnectionDescriptor {
                        chip_select: 0,
                        mode: ModeFlags::empty(),
                        bits_per_word: 8,
                        clock_hz: 1_000_000,
                    },
                },
                Transaction::Write(vec![0xAA, 0x55]),
                Transaction::Duplex {
                    tx: vec![0x0F],
                    rx: vec![0x0F],
                },
                Transaction::Close,
            ]
        );
    }

    #[test]
    fn test_missing_bus_leaves_nothing_open() {
        let bus = DummyBus::new_default();
        let settings = ConnectionSettings::new(5u32);

        assert_eq!(
            SpiSession::open(&bus, &settings).err(),
            Some(Error::DeviceNotFound)
        );
        assert!(bus.transactions().is_empty());
        assert_eq!(bus.close_count(), 0);
    }

    #[test]
    fn test_refused_open() {
        let bus = DummyBus::new(DummyConfig {
            refuse_open: true,
            ..Default::default()
        });

        assert_eq!(
            SpiSession::open(&bus, &ConnectionSettings::new(1u32)).err(),
            Some(Error::TransportOpenFailed)
        );
        assert_eq!(bus.close_count(), 0);
    }

    #[test]
    fn test_scripted_reads_lsb_first() {
        let bus = DummyBus::new(DummyConfig {
            behavior: DummyBehavior::Scripted(VecDeque::from(vec![0x01, 0x02])),
            ..Default::default()
        });
        let settings = ConnectionSettings::new("spi0").with_data_flow(DataFlow::LsbFirst);
        let mut session = SpiSession::open(&bus, &settings).unwrap();

        let mut buf = [0u8; 3];
        session.read(&mut buf).unwrap();
        // Wire bytes 0x01, 0x02, 0xFF reversed per byte
        assert_eq!(buf, [0x80, 0x40, 0xFF]);
    }

    #[test]
    fn test_session_drop_closes_device() {
        let bus = DummyBus::new_default();
        {
            let _session = SpiSession::open(&bus, &ConnectionSettings::new(1u32)).unwrap();
        }
        assert_eq!(bus.close_count(), 1);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("buses", "SPI3;SPI4"), ("fill", "0xA5")]).unwrap();
        assert_eq!(config.buses, vec!["SPI3".to_string(), "SPI4".to_string()]);
        assert_eq!(config.behavior, DummyBehavior::Fill(0xA5));
        assert!(!config.refuse_open);

        let config = parse_options(&[("script", "0102ff"), ("refuse_open", "1")]).unwrap();
        assert_eq!(
            config.behavior,
            DummyBehavior::Scripted(VecDeque::from(vec![0x01, 0x02, 0xFF]))
        );
        assert!(config.refuse_open);

        assert!(parse_options(&[("fill", "0x1FF")]).is_err());
        assert!(parse_options(&[("script", "0g")]).is_err());
        assert!(parse_options(&[("script", "012")]).is_err());
    }
}
