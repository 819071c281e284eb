//! spilink - SPI device access tool
//!
//! Opens a session on an SPI device through one of the compiled-in bus
//! backends and performs a single read, write or full-duplex transfer.
//!
//! # Architecture
//!
//! - `spilink-core` owns the device-session logic (settings validation,
//!   bit-order inversion, duplex length checks)
//! - Backend crates (`spilink-linux-spi`, `spilink-dummy`) enumerate buses
//!   and move bytes
//!
//! Commands are written once against the `SpiBusProvider` trait and
//! dispatched to the selected backend with `with_backend!`.

#[macro_use]
mod backends;
mod cli;
mod commands;
mod hex;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Backends => {
            commands::list_backends();
            Ok(())
        }
        Commands::Buses { backend, name } => {
            let backend = backends::open_backend(&backend)?;
            with_backend!(backend, bus => commands::list_buses(&bus, name.as_deref()))
        }
        Commands::Read {
            backend,
            settings,
            len,
        } => {
            let settings = commands::connection_settings(&settings)?;
            let backend = backends::open_backend(&backend)?;
            with_backend!(backend, bus => commands::run_read(&bus, &settings, len))
        }
        Commands::Write {
            backend,
            settings,
            data,
        } => {
            let settings = commands::connection_settings(&settings)?;
            let backend = backends::open_backend(&backend)?;
            with_backend!(backend, bus => commands::run_write(&bus, &settings, &data))
        }
        Commands::Transfer {
            backend,
            settings,
            data,
        } => {
            let settings = commands::connection_settings(&settings)?;
            let backend = backends::open_backend(&backend)?;
            with_backend!(backend, bus => commands::run_transfer(&bus, &settings, &data))
        }
    }
}
