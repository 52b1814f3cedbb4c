//! Publish sinks
//!
//! The acquisition core only needs `publish(name, value, meta, timestamp)`.
//! Three sinks implement it:
//!
//! | Sink           | Output                                   |
//! |----------------|------------------------------------------|
//! | `JsonLineSink` | one JSON object per line on any writer   |
//! | `UdpSink`      | one JSON datagram per message            |
//! | `MemorySink`   | in-memory list, for tests and embedding  |

use super::{Message, Meta, Value};
use crate::config::{PublisherConfig, SinkKind};
use crate::error::{Error, Result};
use std::io::{self, Stdout, Write};
use std::net::{SocketAddr, UdpSocket};

/// Largest datagram the UDP sink will send
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Downstream telemetry sink
pub trait Sink {
    fn publish(&mut self, name: &str, value: Value, meta: &Meta, timestamp: i64) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn publish(&mut self, name: &str, value: Value, meta: &Meta, timestamp: i64) -> Result<()> {
        (**self).publish(name, value, meta, timestamp)
    }
}

/// Create the sink selected by configuration
pub fn from_config(config: &PublisherConfig) -> Result<Box<dyn Sink>> {
    match config.sink {
        SinkKind::Stdout => Ok(Box::new(JsonLineSink::stdout())),
        SinkKind::Udp => {
            let target = config.udp_target.ok_or_else(|| {
                Error::Config("publisher.sink = \"udp\" requires udp_target".to_string())
            })?;
            Ok(Box::new(UdpSink::new(target)?))
        }
    }
}

fn message(name: &str, value: Value, meta: &Meta, timestamp: i64) -> Message {
    Message {
        name: name.to_string(),
        value,
        meta: meta.clone(),
        timestamp,
    }
}

/// Writes one JSON object per line, flushing after each
pub struct JsonLineSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLineSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Sink for JsonLineSink<W> {
    fn publish(&mut self, name: &str, value: Value, meta: &Meta, timestamp: i64) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &message(name, value, meta, timestamp))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Sends each message as one JSON datagram
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
    /// Reused across sends
    buffer: Vec<u8>,
}

impl UdpSink {
    /// Bind an ephemeral local socket for sending to `target`
    pub fn new(target: SocketAddr) -> Result<Self> {
        let bind = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind)?;
        log::info!("Publishing to UDP {}", target);
        Ok(Self {
            socket,
            target,
            buffer: Vec::with_capacity(512),
        })
    }
}

impl Sink for UdpSink {
    fn publish(&mut self, name: &str, value: Value, meta: &Meta, timestamp: i64) -> Result<()> {
        self.buffer.clear();
        serde_json::to_writer(&mut self.buffer, &message(name, value, meta, timestamp))?;

        if self.buffer.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::Other(format!(
                "Message for {} too large: {} bytes",
                name,
                self.buffer.len()
            )));
        }

        self.socket.send_to(&self.buffer, self.target)?;
        Ok(())
    }
}

/// Keeps every published message in order
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages published under `name`
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| m.name == name)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Sink for MemorySink {
    fn publish(&mut self, name: &str, value: Value, meta: &Meta, timestamp: i64) -> Result<()> {
        self.messages.push(message(name, value, meta, timestamp));
        Ok(())
    }
}
