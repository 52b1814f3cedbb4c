//! sonic-io - acquisition library for METEK sonic3D anemometers
//!
//! Reads the anemometer's semicolon-delimited line protocol over a
//! USB-serial link or an authenticated TCP session and republishes each
//! measured quantity with unit and description metadata.
//!
//! ## Layers
//!
//! - [`transport`]: serial and TCP links behind one `fetch_line` capability
//! - [`device`]: line parsing and the per-poll read operation
//! - [`publish`]: per-field publishing and the sinks it writes to
//! - [`acquisition`]: the reconnecting read loop

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod publish;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
