//! Configuration for sonic-io
//!
//! Loads configuration from a TOML file. Every section except
//! `[connection]` has defaults, so a minimal file only names the transport:
//!
//! ```toml
//! [connection]
//! type = "tcp"
//! host = "10.31.81.50"
//! port = 4001
//! username = "admin"
//! password = "secret"
//! ```
//!
//! Command-line flags are merged on top of the file in [`crate::cli`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport selection and its parameters
///
/// Only the selected variant's fields exist, so a USB configuration cannot
/// carry stray TCP credentials and vice versa.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// USB-serial link
    Usb {
        /// Device path (e.g., "/dev/ttyUSB0")
        device: String,
        /// Baud rate (e.g., 9600)
        baud_rate: u32,
    },
    /// Authenticated TCP session
    Tcp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
}

impl ConnectionConfig {
    /// Short human-readable target, never includes credentials
    pub fn describe(&self) -> String {
        match self {
            ConnectionConfig::Usb { device, baud_rate } => {
                format!("usb:{} @ {} baud", device, baud_rate)
            }
            ConnectionConfig::Tcp { host, port, .. } => format!("tcp:{}:{}", host, port),
        }
    }
}

/// Transport tuning shared by both connection types
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Give up on a line after this long; unset blocks indefinitely
    pub read_timeout_ms: Option<u64>,
    /// Bound on the whole TCP login exchange; 0 waits indefinitely
    pub handshake_timeout_ms: u64,
    /// Bound on each TCP connect attempt; 0 leaves it to the OS
    pub connect_timeout_ms: u64,
    /// Bytes allowed to pile up without a line terminator
    pub max_line_bytes: usize,
}

impl LinkConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: None,
            handshake_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
            max_line_bytes: 4096,
        }
    }
}

/// Acquisition loop timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Pause between connection attempts
    pub retry_interval_ms: u64,
    /// Pause after a transport loss before reconnecting
    pub reconnect_delay_ms: u64,
    /// Pause after connecting before the first read
    pub settle_ms: u64,
    /// Log every parsed record at info level
    pub echo_records: bool,
}

impl AcquisitionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 60_000,
            reconnect_delay_ms: 30_000,
            settle_ms: 2_000,
            echo_records: false,
        }
    }
}

/// Where published measurements go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// JSON lines on stdout
    #[default]
    Stdout,
    /// JSON datagrams to `udp_target`
    Udp,
}

/// Publisher configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub sink: SinkKind,
    /// Datagram destination when `sink = "udp"`
    pub udp_target: Option<SocketAddr>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use sonic_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("sonic-io.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration: sonic3D on the first USB-serial adapter
    pub fn sonic3d_defaults() -> Self {
        Self {
            connection: ConnectionConfig::Usb {
                device: "/dev/ttyUSB0".to_string(),
                baud_rate: 9600,
            },
            link: LinkConfig::default(),
            acquisition: AcquisitionConfig::default(),
            publisher: PublisherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::sonic3d_defaults()
    }
}
