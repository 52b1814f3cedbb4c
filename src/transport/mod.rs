//! Transport layer for I/O abstraction
//!
//! Both links the anemometer speaks over reduce to one capability: block
//! until the next complete protocol line is available. How bytes are pulled
//! off the wire, and whether a login precedes them, stays inside each
//! implementation.

use crate::config::{ConnectionConfig, LinkConfig};
use crate::error::Result;

pub mod framer;
#[cfg(test)]
mod mock;
mod serial;
mod tcp;

pub use framer::LineFramer;
#[cfg(test)]
pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// Transport trait for device communication
pub trait Transport: Send {
    /// Return the next complete line without its terminator
    ///
    /// Bytes received past the line are retained for the next call.
    fn fetch_line(&mut self) -> Result<Vec<u8>>;

    /// Short description of the remote end for log messages
    fn describe(&self) -> String;
}

/// Establish the transport selected by `connection`
///
/// No retry happens here; the acquisition loop owns the retry policy.
pub fn open(connection: &ConnectionConfig, link: &LinkConfig) -> Result<Box<dyn Transport>> {
    match connection {
        ConnectionConfig::Usb { device, baud_rate } => {
            let transport = SerialTransport::open(device, *baud_rate, link)?;
            Ok(Box::new(transport))
        }
        ConnectionConfig::Tcp {
            host,
            port,
            username,
            password,
        } => {
            let transport = TcpTransport::connect(host, *port, username, password, link)?;
            Ok(Box::new(transport))
        }
    }
}
