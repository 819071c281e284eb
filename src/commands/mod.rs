//! CLI command implementations
//!
//! Device commands are generic over [`SpiBusProvider`](spilink_core::SpiBusProvider),
//! so the same code drives every backend. Each command opens one session,
//! performs its transfer and closes the session again.

mod device;
mod list;

pub use device::{connection_settings, run_read, run_transfer, run_write};
pub use list::{list_backends, list_buses};
