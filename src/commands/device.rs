//! Device commands: read, write and full-duplex transfer

use crate::cli::{CsActive, SettingsArgs};
use crate::hex::{format_hex, parse_hex_bytes};
use spilink_core::{
    BusId, ChipSelectActiveState, ConnectionSettings, DataFlow, Error, SpiBusProvider, SpiDevice,
    SpiMode, SpiSession,
};

/// Convert a session error for the top-level report, noting when a retry
/// may help
fn session_error(e: Error) -> Box<dyn std::error::Error> {
    if e.is_transient() {
        log::warn!("{} (transient, retrying may succeed)", e);
    }
    e.into()
}

/// Build connection settings from command-line arguments
pub fn connection_settings(
    args: &SettingsArgs,
) -> Result<ConnectionSettings, Box<dyn std::error::Error>> {
    let mode = SpiMode::try_from(args.mode)
        .map_err(|e| format!("SPI mode {}: {}", args.mode, e))?;

    let active = match args.cs_active {
        CsActive::Low => ChipSelectActiveState::Low,
        CsActive::High => ChipSelectActiveState::High,
    };

    let flow = if args.lsb_first {
        DataFlow::LsbFirst
    } else {
        DataFlow::MsbFirst
    };

    Ok(ConnectionSettings::new(BusId::new(args.bus.as_str()))
        .with_chip_select_line(args.cs)
        .with_chip_select_active_state(active)
        .with_mode(mode)
        .with_data_bit_length(args.bits)
        .with_clock_frequency(args.speed)
        .with_data_flow(flow))
}

/// Read `len` bytes and print them as hex
pub fn run_read<P: SpiBusProvider>(
    provider: &P,
    settings: &ConnectionSettings,
    len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SpiSession::open(provider, settings).map_err(session_error)?;

    let mut buf = vec![0u8; len];
    session.read(&mut buf).map_err(session_error)?;
    session.close().map_err(session_error)?;

    println!("{}", format_hex(&buf));
    Ok(())
}

/// Write hex `data` to the device
pub fn run_write<P: SpiBusProvider>(
    provider: &P,
    settings: &ConnectionSettings,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = parse_hex_bytes(data)?;
    let mut session = SpiSession::open(provider, settings).map_err(session_error)?;

    session.write(&bytes).map_err(session_error)?;
    session.close().map_err(session_error)?;

    log::info!("Wrote {} bytes", bytes.len());
    Ok(())
}

/// Exchange hex `data` with the device and print what came back
pub fn run_transfer<P: SpiBusProvider>(
    provider: &P,
    settings: &ConnectionSettings,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = parse_hex_bytes(data)?;
    let mut session = SpiSession::open(provider, settings).map_err(session_error)?;

    let mut received = vec![0u8; bytes.len()];
    session
        .transfer_full_duplex(&bytes, &mut received)
        .map_err(session_error)?;
    session.close().map_err(session_error)?;

    println!("{}", format_hex(&received));
    Ok(())
}
