//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand, ValueEnum};

/// Parse a frequency in Hz, accepting `k`/`M` suffixes (e.g. `500k`, `4M`)
fn parse_frequency(s: &str) -> Result<u32, String> {
    let (digits, scale) = if let Some(n) = s.strip_suffix(&['M', 'm'][..]) {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix(&['K', 'k'][..]) {
        (n, 1_000)
    } else {
        (s, 1)
    };

    digits
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("Invalid frequency: {}", e))?
        .checked_mul(scale)
        .ok_or_else(|| format!("Frequency out of range: {}", s))
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Bus backend to use [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spilink")]
#[command(author, version, about = "SPI device access tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Chip-select active level
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CsActive {
    /// Asserted low
    #[default]
    Low,
    /// Asserted high
    High,
}

/// Connection settings shared across device commands
#[derive(clap::Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Bus identifier (number, enumerated as SPI<n>, or a controller name)
    #[arg(long, default_value = "0")]
    pub bus: String,

    /// Chip-select line (-1 for no chip-select management)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cs: i32,

    /// Chip-select active level
    #[arg(long, value_enum, default_value_t = CsActive::Low)]
    pub cs_active: CsActive,

    /// SPI mode (0-3)
    #[arg(long, default_value_t = 0)]
    pub mode: u8,

    /// Word size in bits
    #[arg(long, default_value_t = 8)]
    pub bits: u8,

    /// Clock frequency in Hz (suffixes k and M accepted)
    #[arg(long, default_value = "1M", value_parser = parse_frequency)]
    pub speed: u32,

    /// Shift bytes least significant bit first
    #[arg(long)]
    pub lsb_first: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available backends
    Backends,

    /// List buses known to a backend
    Buses {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Only show buses with this name (e.g. SPI0)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Read bytes from a device
    Read {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Number of bytes to read
        #[arg(short, long)]
        len: usize,
    },

    /// Write bytes to a device
    Write {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Bytes to write, in hex (e.g. "9F 00 00" or 0x9f0000)
        #[arg(short, long)]
        data: String,
    },

    /// Full-duplex transfer: write bytes while reading the same number back
    Transfer {
        /// Backend to use
        #[arg(short, long, help = backend_help())]
        backend: String,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Bytes to write, in hex
        #[arg(short, long)]
        data: String,
    },
}
