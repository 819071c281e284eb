//! Linux SPI bus provider implementation
//!
//! `LinuxSpiBus` enumerates `/dev/spidevB.C` nodes and opens them as
//! `LinuxSpiDevice` transports, using Linux's spidev ioctl interface.

use crate::error::{LinuxSpiError, Result};

use spilink_core::error::{Error as CoreError, Result as CoreResult};
use spilink_core::{BusDescriptor, NativeConnectionDescriptor, SpiBusProvider, SpiTransport};

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default directory holding spidev nodes
const DEFAULT_DEV_DIR: &str = "/dev";

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    // Generate ioctl functions
    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    // SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])

    /// Size of spi_ioc_transfer struct
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr), _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for the Linux SPI bus provider
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Directory holding `spidevB.C` nodes (default: `/dev`)
    pub dev_dir: PathBuf,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from(DEFAULT_DEV_DIR),
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration scanning the given directory
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }
}

/// A spidev node name split into bus and chip select
fn parse_node_name(name: &str) -> Option<(u32, u32)> {
    let rest = name.strip_prefix("spidev")?;
    let (bus, cs) = rest.split_once('.')?;
    Some((bus.parse().ok()?, cs.parse().ok()?))
}

/// Linux SPI bus provider using the spidev interface
pub struct LinuxSpiBus {
    config: LinuxSpiConfig,
}

impl LinuxSpiBus {
    /// Create a provider with the given configuration
    pub fn new(config: LinuxSpiConfig) -> Self {
        Self { config }
    }

    /// Scan the device directory, returning chip-select lines per bus number
    pub fn scan(&self) -> Result<BTreeMap<u32, Vec<u32>>> {
        let dir = &self.config.dev_dir;
        let entries = std::fs::read_dir(dir).map_err(|e| LinuxSpiError::ScanFailed {
            path: dir.clone(),
            source: e,
        })?;

        let mut buses: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if let Some((bus, cs)) = name.to_str().and_then(parse_node_name) {
                buses.entry(bus).or_default().push(cs);
            }
        }
        for lines in buses.values_mut() {
            lines.sort_unstable();
        }

        log::debug!("linux_spi: Found {} bus(es) in {}", buses.len(), dir.display());
        Ok(buses)
    }

    fn node_path(&self, bus: &BusDescriptor, chip_select: u32) -> PathBuf {
        self.config
            .dev_dir
            .join(format!("spidev{}.{}", bus.id, chip_select))
    }
}

impl SpiBusProvider for LinuxSpiBus {
    type Transport = LinuxSpiDevice;

    fn list_buses(&self) -> CoreResult<Vec<BusDescriptor>> {
        let buses = self.scan().map_err(|e| {
            log::error!("linux_spi: {}", e);
            CoreError::DeviceNotFound
        })?;

        Ok(buses
            .keys()
            .map(|bus| BusDescriptor::new(format!("SPI{}", bus), bus.to_string()))
            .collect())
    }

    fn find_buses(&self, name_hint: &str) -> CoreResult<Vec<BusDescriptor>> {
        Ok(self
            .list_buses()?
            .into_iter()
            .filter(|desc| desc.name.eq_ignore_ascii_case(name_hint))
            .collect())
    }

    fn open_device(
        &self,
        bus: &BusDescriptor,
        native: &NativeConnectionDescriptor,
    ) -> CoreResult<Option<LinuxSpiDevice>> {
        let path = self.node_path(bus, native.chip_select);

        match LinuxSpiDevice::open(&path, native) {
            Ok(device) => Ok(Some(device)),
            Err(LinuxSpiError::OpenFailed { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::warn!("linux_spi: {} does not exist", path.display());
                Ok(None)
            }
            Err(e) => {
                log::error!("linux_spi: {}", e);
                Err(CoreError::TransportOpenFailed)
            }
        }
    }
}

/// An open spidev device
pub struct LinuxSpiDevice {
    /// File handle for spidev device, `None` once closed
    file: Option<File>,
    /// Path the device was opened from
    path: PathBuf,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Clock speed in Hz
    speed_hz: u32,
    /// Word size in bits
    bits_per_word: u8,
}

impl LinuxSpiDevice {
    /// Open a spidev node and apply the native connection parameters
    pub fn open(path: &Path, native: &NativeConnectionDescriptor) -> Result<Self> {
        log::debug!("linux_spi: Opening device {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // Set SPI mode
        let mode = native.mode.bits();
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        // Set bits per word
        let bits = native.bits_per_word;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        // Set clock speed
        let speed = native.clock_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode=0x{:02X}, bits={}, speed={} kHz)",
            path.display(),
            mode,
            bits,
            speed / 1000
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            max_kernel_buf_size,
            speed_hz: speed,
            bits_per_word: bits,
        })
    }

    /// Path of the underlying spidev node
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a single SPI_IOC_MESSAGE(1) transfer
    ///
    /// Either buffer may be absent for a half-duplex transfer; when both
    /// are present they have the same length.
    fn spi_transfer(&mut self, tx: Option<&[u8]>, rx: Option<&mut [u8]>) -> Result<()> {
        let fd = self.file.as_ref().ok_or(LinuxSpiError::Closed)?.as_raw_fd();

        let len = match (&tx, &rx) {
            (Some(tx), _) => tx.len(),
            (None, Some(rx)) => rx.len(),
            (None, None) => 0,
        };
        if len > self.max_kernel_buf_size {
            return Err(LinuxSpiError::TransferTooLarge {
                len,
                max: self.max_kernel_buf_size,
            });
        }

        let transfer = SpiIocTransfer {
            tx_buf: tx.map_or(0, |buf| buf.as_ptr() as u64),
            rx_buf: rx.map_or(0, |buf| buf.as_mut_ptr() as u64),
            len: len as u32,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            ..Default::default()
        };

        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }
}

fn to_core(e: LinuxSpiError) -> CoreError {
    log::error!("linux_spi: {}", e);
    CoreError::TransferFailed
}

impl SpiTransport for LinuxSpiDevice {
    fn read(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        self.spi_transfer(None, Some(buf)).map_err(to_core)
    }

    fn write(&mut self, data: &[u8]) -> CoreResult<()> {
        self.spi_transfer(Some(data), None).map_err(to_core)
    }

    fn transfer_full_duplex(&mut self, tx: &[u8], rx: &mut [u8]) -> CoreResult<()> {
        if tx.len() != rx.len() {
            return Err(CoreError::InvalidArgument);
        }
        self.spi_transfer(Some(tx), Some(rx)).map_err(to_core)
    }

    fn close(&mut self) -> CoreResult<()> {
        if self.file.take().is_some() {
            log::debug!("linux_spi: Closed {}", self.path.display());
        }
        Ok(())
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    // Fall back to page size
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

/// Parse backend options from a list of key-value pairs
///
/// - `dev_dir=/dev` - directory to scan for spidev nodes
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxSpiConfig, String> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev_dir" => {
                if value.is_empty() {
                    return Err("dev_dir cannot be empty".to_string());
                }
                config.dev_dir = PathBuf::from(value);
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spilink_core::{ConnectionSettings, SpiSession};

    /// Create an empty scratch directory unique to this test
    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "spilink-linux-spi-{}-{}",
            std::process::id(),
            test
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_parse_node_name() {
        assert_eq!(parse_node_name("spidev0.0"), Some((0, 0)));
        assert_eq!(parse_node_name("spidev12.3"), Some((12, 3)));
        assert_eq!(parse_node_name("spidev0"), None);
        assert_eq!(parse_node_name("spidevx.0"), None);
        assert_eq!(parse_node_name("ttyS0"), None);
    }

    #[test]
    fn test_scan_groups_by_bus() {
        let dir = scratch_dir("scan");
        touch(&dir, "spidev1.1");
        touch(&dir, "spidev1.0");
        touch(&dir, "spidev0.0");
        touch(&dir, "null");

        let bus = LinuxSpiBus::new(LinuxSpiConfig::new(&dir));
        let buses = bus.scan().unwrap();
        assert_eq!(buses.len(), 2);
        assert_eq!(buses[&0], vec![0]);
        assert_eq!(buses[&1], vec![0, 1]);

        let found = bus.find_buses("spi1").unwrap();
        assert_eq!(found, vec![BusDescriptor::new("SPI1", "1")]);
        assert!(bus.find_buses("SPI2").unwrap().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_chip_select_node_is_open_failure() {
        let dir = scratch_dir("missing-cs");
        touch(&dir, "spidev0.0");

        let bus = LinuxSpiBus::new(LinuxSpiConfig::new(&dir));
        let settings = ConnectionSettings::new(0u32).with_chip_select_line(3);
        assert_eq!(
            SpiSession::open(&bus, &settings).err(),
            Some(CoreError::TransportOpenFailed)
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_bus_is_not_found() {
        let dir = scratch_dir("missing-bus");

        let bus = LinuxSpiBus::new(LinuxSpiConfig::new(&dir));
        assert_eq!(
            SpiSession::open(&bus, &ConnectionSettings::new(0u32)).err(),
            Some(CoreError::DeviceNotFound)
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ioctl_message_number() {
        // _IOW('k', 0, char[32])
        assert_eq!(ioctl::spi_ioc_message(1), 0x4020_6B00);
        assert_eq!(std::mem::size_of::<SpiIocTransfer>(), ioctl::SPI_IOC_TRANSFER_SIZE);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("dev_dir", "/tmp/spi")]).unwrap();
        assert_eq!(config.dev_dir, PathBuf::from("/tmp/spi"));

        let config = parse_options(&[]).unwrap();
        assert_eq!(config.dev_dir, PathBuf::from("/dev"));

        assert!(parse_options(&[("dev_dir", "")]).is_err());
    }
}
