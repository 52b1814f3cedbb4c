//! Command-line interface
//!
//! Flags keep the underscore spelling the field deployments already use
//! (`--connection_type`, `--baud_rate`, ...). They override values loaded
//! from `--config`.

use crate::config::{AppConfig, ConnectionConfig, SinkKind};
use crate::error::{Error, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Transport selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConnectionType {
    Usb,
    Tcp,
}

/// sonic3D anemometer interface
#[derive(Debug, Parser)]
#[command(name = "sonic-io", version, about)]
pub struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Transport to the device
    #[arg(long = "connection_type", value_enum, required_unless_present = "config")]
    pub connection_type: Option<ConnectionType>,

    /// Serial device path (usb)
    #[arg(long)]
    pub device: Option<String>,

    /// Serial baud rate (usb)
    #[arg(long = "baud_rate")]
    pub baud_rate: Option<u32>,

    /// Device address (tcp)
    #[arg(long)]
    pub ip: Option<String>,

    /// Device port (tcp)
    #[arg(long)]
    pub port: Option<u16>,

    /// Login name (tcp)
    #[arg(long)]
    pub username: Option<String>,

    /// Login password (tcp)
    #[arg(long)]
    pub password: Option<String>,

    /// Publish JSON datagrams to this address instead of stdout
    #[arg(long = "udp_target")]
    pub udp_target: Option<SocketAddr>,

    /// Debug logging and echo of every parsed record
    #[arg(long)]
    pub debug: bool,
}

impl ConnectionType {
    fn of(connection: &ConnectionConfig) -> Self {
        match connection {
            ConnectionConfig::Usb { .. } => ConnectionType::Usb,
            ConnectionConfig::Tcp { .. } => ConnectionType::Tcp,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConnectionType::Usb => "usb",
            ConnectionType::Tcp => "tcp",
        }
    }
}

impl Args {
    /// Merge flags over the config file, or over defaults without one
    pub fn resolve(&self) -> Result<AppConfig> {
        let (mut config, from_file) = match &self.config {
            Some(path) => (AppConfig::from_file(path)?, true),
            None => (AppConfig::default(), false),
        };

        let base = from_file.then_some(&config.connection);
        config.connection = self.connection(base)?;

        if let Some(target) = self.udp_target {
            config.publisher.sink = SinkKind::Udp;
            config.publisher.udp_target = Some(target);
        }

        if self.debug {
            config.logging.level = "debug".to_string();
            config.acquisition.echo_records = true;
        }

        Ok(config)
    }

    /// Transport flags laid over `base`
    ///
    /// File values are only reused when the flags keep the file's transport.
    fn connection(&self, base: Option<&ConnectionConfig>) -> Result<ConnectionConfig> {
        let kind = match (self.connection_type, base) {
            (Some(kind), _) => kind,
            (None, Some(base)) => ConnectionType::of(base),
            (None, None) => {
                return Err(Error::Config(
                    "--connection_type is required without --config".to_string(),
                ));
            }
        };
        let base = base.filter(|b| ConnectionType::of(b) == kind);
        let name = kind.name();

        Ok(match (kind, base) {
            (
                ConnectionType::Usb,
                Some(ConnectionConfig::Usb { device, baud_rate }),
            ) => ConnectionConfig::Usb {
                device: merged(&self.device, Some(device), "--device", name)?,
                baud_rate: merged(&self.baud_rate, Some(baud_rate), "--baud_rate", name)?,
            },
            (ConnectionType::Usb, _) => ConnectionConfig::Usb {
                device: merged(&self.device, None, "--device", name)?,
                baud_rate: merged(&self.baud_rate, None, "--baud_rate", name)?,
            },
            (
                ConnectionType::Tcp,
                Some(ConnectionConfig::Tcp {
                    host,
                    port,
                    username,
                    password,
                }),
            ) => ConnectionConfig::Tcp {
                host: merged(&self.ip, Some(host), "--ip", name)?,
                port: merged(&self.port, Some(port), "--port", name)?,
                username: merged(&self.username, Some(username), "--username", name)?,
                password: merged(&self.password, Some(password), "--password", name)?,
            },
            (ConnectionType::Tcp, _) => ConnectionConfig::Tcp {
                host: merged(&self.ip, None, "--ip", name)?,
                port: merged(&self.port, None, "--port", name)?,
                username: merged(&self.username, None, "--username", name)?,
                password: merged(&self.password, None, "--password", name)?,
            },
        })
    }
}

/// Flag value if given, else the file's, else a missing-flag error
fn merged<T: Clone>(flag: &Option<T>, file: Option<&T>, name: &str, kind: &str) -> Result<T> {
    flag.clone()
        .or_else(|| file.cloned())
        .ok_or_else(|| Error::Config(format!("{} is required for {} connections", name, kind)))
}
