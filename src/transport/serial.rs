//! Serial transport implementation

use super::Transport;
use super::framer::{LF, LineFramer};
use crate::config::LinkConfig;
use crate::error::{Error, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};

/// Port read timeout; a tick of the polling loop, not a data deadline
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Back-off when the driver reports zero bytes without blocking
const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Serial transport for the USB-serial link
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    path: String,
    baud_rate: u32,
    read_timeout: Option<Duration>,
}

impl SerialTransport {
    /// Open a serial port at 8N1, no flow control
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 9600)
    pub fn open(path: &str, baud_rate: u32, link: &LinkConfig) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(SerialTransport {
            port,
            framer: LineFramer::new(LF, link.max_line_bytes),
            path: path.to_string(),
            baud_rate,
            read_timeout: link.read_timeout(),
        })
    }
}

impl Transport for SerialTransport {
    fn fetch_line(&mut self) -> Result<Vec<u8>> {
        let Self {
            port,
            framer,
            read_timeout,
            ..
        } = self;
        let deadline = read_timeout.map(|timeout| (Instant::now() + timeout, timeout));

        framer.next_line(|chunk| {
            // Serial reads never signal end-of-stream: keep polling until
            // bytes arrive or the optional deadline passes
            loop {
                match port.read(chunk) {
                    Ok(0) => thread::sleep(IDLE_SLEEP),
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e.into()),
                }

                if let Some((at, timeout)) = deadline
                    && Instant::now() >= at
                {
                    return Err(Error::Timeout(timeout));
                }
            }
        })
    }

    fn describe(&self) -> String {
        format!("usb:{} @ {} baud", self.path, self.baud_rate)
    }
}
