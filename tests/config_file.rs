//! Configuration file loading and command-line merging.

use clap::Parser;
use sonic_io::cli::Args;
use sonic_io::config::{AppConfig, ConnectionConfig, SinkKind};
use std::io::Write;
use tempfile::NamedTempFile;

const TCP_CONFIG: &str = r#"
[connection]
type = "tcp"
host = "10.31.81.50"
port = 4001
username = "admin"
password = "secret"

[acquisition]
settle_ms = 500

[publisher]
sink = "udp"
udp_target = "127.0.0.1:5556"
"#;

const USB_CONFIG: &str = r#"
[connection]
type = "usb"
device = "/dev/ttyUSB0"
baud_rate = 9600
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(TCP_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.connection.describe(), "tcp:10.31.81.50:4001");
    assert_eq!(config.acquisition.settle_ms, 500);
    assert_eq!(config.acquisition.retry_interval_ms, 60_000);
    assert_eq!(config.publisher.sink, SinkKind::Udp);
}

#[test]
fn test_file_round_trip() {
    let file = NamedTempFile::new().unwrap();
    let mut config = AppConfig::sonic3d_defaults();
    config.link.read_timeout_ms = Some(2_500);

    config.to_file(file.path()).unwrap();
    assert_eq!(AppConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_invalid_file_is_reported() {
    let file = write_config("[connection]\ntype = \"modem\"\n");
    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("TOML parse error"));
}

#[test]
fn test_flags_override_file() {
    let file = write_config(TCP_CONFIG);
    let path = file.path().to_str().unwrap();

    let args = Args::try_parse_from([
        "sonic-io",
        "--config",
        path,
        "--connection_type",
        "usb",
        "--device",
        "/dev/ttyUSB3",
        "--baud_rate",
        "19200",
        "--debug",
    ])
    .unwrap();
    let config = args.resolve().unwrap();

    assert_eq!(
        config.connection,
        ConnectionConfig::Usb {
            device: "/dev/ttyUSB3".to_string(),
            baud_rate: 19200
        }
    );
    // Untouched sections come from the file
    assert_eq!(config.acquisition.settle_ms, 500);
    assert_eq!(config.publisher.sink, SinkKind::Udp);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_config_alone_is_enough() {
    let file = write_config(TCP_CONFIG);
    let path = file.path().to_str().unwrap();

    let config = Args::try_parse_from(["sonic-io", "--config", path])
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(config.connection.describe(), "tcp:10.31.81.50:4001");
}

#[test]
fn test_single_flag_overrides_file() {
    let file = write_config(USB_CONFIG);
    let path = file.path().to_str().unwrap();

    let config = Args::try_parse_from(["sonic-io", "--config", path, "--baud_rate", "19200"])
        .unwrap()
        .resolve()
        .unwrap();
    assert_eq!(
        config.connection,
        ConnectionConfig::Usb {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 19200
        }
    );
}

#[test]
fn test_same_connection_type_keeps_file_values() {
    let file = write_config(TCP_CONFIG);
    let path = file.path().to_str().unwrap();

    let config = Args::try_parse_from([
        "sonic-io",
        "--config",
        path,
        "--connection_type",
        "tcp",
        "--password",
        "rotated",
    ])
    .unwrap()
    .resolve()
    .unwrap();
    assert_eq!(
        config.connection,
        ConnectionConfig::Tcp {
            host: "10.31.81.50".to_string(),
            port: 4001,
            username: "admin".to_string(),
            password: "rotated".to_string(),
        }
    );
}

#[test]
fn test_switching_transport_needs_its_flags() {
    let file = write_config(TCP_CONFIG);
    let path = file.path().to_str().unwrap();

    let err = Args::try_parse_from([
        "sonic-io",
        "--config",
        path,
        "--connection_type",
        "usb",
        "--device",
        "/dev/ttyUSB3",
    ])
    .unwrap()
    .resolve()
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration error: --baud_rate is required for usb connections"
    );
}
