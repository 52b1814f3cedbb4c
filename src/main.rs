//! sonic-io - acquisition daemon for METEK sonic3D anemometers
//!
//! Usage:
//!
//! ```text
//! sonic-io --connection_type usb --device /dev/ttyUSB0 --baud_rate 9600
//! sonic-io --connection_type tcp --ip 10.31.81.50 --port 4001 \
//!          --username admin --password secret
//! sonic-io --config /etc/sonic-io.toml
//! ```
//!
//! Measurements are written as JSON lines to stdout unless a UDP target is
//! configured. The daemon keeps running through read and connection errors
//! and stops on Ctrl-C or SIGTERM.

use clap::Parser;
use sonic_io::acquisition::{Acquisition, Endpoint};
use sonic_io::cli::Args;
use sonic_io::device::sonic3d;
use sonic_io::error::{Error, Result};
use sonic_io::publish::sink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("Error running device interface: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            // Logger not configured yet
            eprintln!("{}", e);
            return Err(e);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("sonic-io v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Device: {}", config.connection.describe());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let sink = sink::from_config(&config.publisher)?;
    let endpoint = Endpoint {
        connection: config.connection.clone(),
        link: config.link.clone(),
    };

    let mut acquisition = Acquisition::new(
        endpoint,
        sink,
        sonic3d::field_map(),
        sonic3d::metadata(),
        config.acquisition.clone(),
        running,
    );
    acquisition.run();

    log::info!("sonic-io stopped");
    Ok(())
}
