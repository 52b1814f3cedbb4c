//! Acquisition loop
//!
//! Drives one [`DeviceConnection`] at a time through a small state machine:
//!
//! ```text
//!            ┌──────────── retry_interval ───────────┐
//!            ▼                                       │ connect failed
//!      CONNECTING ───────────────────────────────────┘
//!            │ connected (publish "connected")
//!            ▼
//!      CONNECTED ── settle ──▶ READING ◀──┐
//!                                │  │     │ record published / rejected
//!                                │  └─────┘
//!                                │ transport lost
//!                                ▼
//!                   reconnect_delay ──▶ CONNECTING
//! ```
//!
//! A rejected record (bad shape, bad number) never ends the session; only
//! transport errors do. Every failure is logged and published on `status`.
//! The loop runs until the shared running flag is cleared.

use crate::config::{AcquisitionConfig, ConnectionConfig, LinkConfig};
use crate::device::{DeviceConnection, FieldMap, ReadOutcome};
use crate::error::Result;
use crate::publish::{self, SensorMetadata, Sink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between running-flag checks
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Source of fresh device connections
pub trait Connector {
    fn connect(&mut self) -> Result<DeviceConnection>;

    /// Target description for log messages
    fn describe(&self) -> String;
}

/// Connector for a configured serial or TCP endpoint
pub struct Endpoint {
    pub connection: ConnectionConfig,
    pub link: LinkConfig,
}

impl Connector for Endpoint {
    fn connect(&mut self) -> Result<DeviceConnection> {
        DeviceConnection::open(&self.connection, &self.link)
    }

    fn describe(&self) -> String {
        self.connection.describe()
    }
}

/// What one read cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Record published with this many fields
    Published(usize),
    /// Record rejected or its publish failed; keep reading
    Skipped,
    /// Transport unusable; reconnect
    TransportLost,
}

/// The acquisition loop
pub struct Acquisition<C: Connector, S: Sink> {
    connector: C,
    sink: S,
    fields: FieldMap,
    metadata: SensorMetadata,
    config: AcquisitionConfig,
    running: Arc<AtomicBool>,
}

impl<C: Connector, S: Sink> Acquisition<C, S> {
    pub fn new(
        connector: C,
        sink: S,
        fields: FieldMap,
        metadata: SensorMetadata,
        config: AcquisitionConfig,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            connector,
            sink,
            fields,
            metadata,
            config,
            running,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run until the running flag is cleared
    pub fn run(&mut self) {
        log::info!("Acquisition started for {}", self.connector.describe());

        while self.is_running() {
            let Some(mut device) = self.connect_with_retry() else {
                break;
            };

            self.sleep(self.config.settle());

            while self.is_running() {
                if self.step(&mut device) == Cycle::TransportLost {
                    break;
                }
            }

            drop(device);

            if self.is_running() {
                log::info!(
                    "Attempting to reconnect in {:?}...",
                    self.config.reconnect_delay()
                );
                self.sleep(self.config.reconnect_delay());
            }
        }

        log::info!("Acquisition stopped");
    }

    /// Connect, retrying with a fixed backoff
    ///
    /// Returns `None` only when shutdown was requested first.
    pub fn connect_with_retry(&mut self) -> Option<DeviceConnection> {
        while self.is_running() {
            match self.connector.connect() {
                Ok(device) => {
                    log::info!("Connected to {}", device.describe());
                    publish::publish_status(&mut self.sink, "connected");
                    return Some(device);
                }
                Err(e) => {
                    log::error!(
                        "Error connecting to device: {}. Retrying in {:?}.",
                        e,
                        self.config.retry_interval()
                    );
                    publish::publish_status(&mut self.sink, &e.to_string());
                    self.sleep(self.config.retry_interval());
                }
            }
        }
        None
    }

    /// Read, parse and publish one record
    pub fn step(&mut self, device: &mut DeviceConnection) -> Cycle {
        match device.poll(&self.fields) {
            ReadOutcome::Record(record) => {
                if self.config.echo_records {
                    log::info!("{:?}", record);
                }
                match publish::publish_record(
                    &mut self.sink,
                    &record,
                    &self.fields,
                    &self.metadata,
                    None,
                ) {
                    Ok(count) => Cycle::Published(count),
                    Err(e) => {
                        log::error!("Failed to publish record: {}", e);
                        Cycle::Skipped
                    }
                }
            }
            ReadOutcome::Rejected(e) => {
                log::error!("Value error: {}", e);
                publish::publish_status(&mut self.sink, &e.to_string());
                Cycle::Skipped
            }
            ReadOutcome::TransportLost(e) => {
                log::error!("Transport error: {} while reading data.", e);
                publish::publish_status(&mut self.sink, &e.to_string());
                Cycle::TransportLost
            }
        }
    }

    /// Sleep in slices so a shutdown request is noticed promptly
    fn sleep(&self, duration: Duration) {
        let until = Instant::now() + duration;
        while self.is_running() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep((until - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sonic3d;
    use crate::error::Error;
    use crate::publish::{MemorySink, Value};
    use crate::transport::MockTransport;
    use std::collections::VecDeque;

    const LINE: &[u8] = b"010000320000;-0.001;-0.036;0.012;23.602;0.036;1.525\r\n";

    /// Hands out scripted connections; clears the running flag once empty
    struct ScriptedConnector {
        script: VecDeque<Result<MockTransport>>,
        running: Arc<AtomicBool>,
        attempts: usize,
    }

    impl Connector for ScriptedConnector {
        fn connect(&mut self) -> Result<DeviceConnection> {
            self.attempts += 1;
            match self.script.pop_front() {
                Some(Ok(mock)) => Ok(DeviceConnection::new(Box::new(mock))),
                Some(Err(e)) => Err(e),
                None => {
                    self.running.store(false, Ordering::Relaxed);
                    Err(Error::Other("script exhausted".to_string()))
                }
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn fast() -> AcquisitionConfig {
        AcquisitionConfig {
            retry_interval_ms: 0,
            reconnect_delay_ms: 0,
            settle_ms: 0,
            echo_records: true,
        }
    }

    fn acquisition(
        script: Vec<Result<MockTransport>>,
    ) -> Acquisition<ScriptedConnector, MemorySink> {
        let running = Arc::new(AtomicBool::new(true));
        let connector = ScriptedConnector {
            script: script.into(),
            running: Arc::clone(&running),
            attempts: 0,
        };
        Acquisition::new(
            connector,
            MemorySink::new(),
            sonic3d::field_map(),
            sonic3d::metadata(),
            fast(),
            running,
        )
    }

    fn statuses(sink: &MemorySink) -> Vec<String> {
        sink.named("status")
            .map(|m| match &m.value {
                Value::Text(text) => text.clone(),
                Value::Number(n) => n.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_step_publishes_record() {
        let mock = MockTransport::new();
        mock.inject_read(LINE);
        let mut acq = acquisition(vec![]);
        let mut device = DeviceConnection::new(Box::new(mock));

        assert_eq!(acq.step(&mut device), Cycle::Published(4));
        assert_eq!(acq.sink().messages().len(), 4);
    }

    #[test]
    fn test_rejected_record_keeps_session() {
        let mock = MockTransport::new();
        mock.inject_read(b"S;1.0;oops;3.0;4.0\r\n");
        mock.inject_read(LINE);
        let mut acq = acquisition(vec![]);
        let mut device = DeviceConnection::new(Box::new(mock.clone()));

        assert_eq!(acq.step(&mut device), Cycle::Skipped);
        assert_eq!(acq.step(&mut device), Cycle::Published(4));
        assert_eq!(
            statuses(acq.sink()),
            vec!["Invalid value \"oops\" for field V".to_string()]
        );
    }

    #[test]
    fn test_transport_loss_reported() {
        let mock = MockTransport::new();
        let mut acq = acquisition(vec![]);
        let mut device = DeviceConnection::new(Box::new(mock));

        assert_eq!(acq.step(&mut device), Cycle::TransportLost);
        assert_eq!(
            statuses(acq.sink()),
            vec!["Connection closed by peer".to_string()]
        );
    }

    #[test]
    fn test_connect_retries_until_success() {
        let mock = MockTransport::new();
        let mut acq = acquisition(vec![
            Err(Error::Other("No such file or directory".to_string())),
            Err(Error::Authentication("Login incorrect".to_string())),
            Ok(mock),
        ]);

        assert!(acq.connect_with_retry().is_some());
        assert_eq!(acq.connector.attempts, 3);
        assert_eq!(
            statuses(acq.sink()),
            vec![
                "No such file or directory".to_string(),
                "Authentication failed: Login incorrect".to_string(),
                "connected".to_string(),
            ]
        );
    }

    #[test]
    fn test_run_reconnects_after_transport_loss() {
        let first = MockTransport::new();
        first.inject_read(LINE);
        first.inject_read(b"garbage\r\n");
        // then closed

        let second = MockTransport::new();
        second.inject_read(LINE);

        let mut acq = acquisition(vec![Ok(first.clone()), Ok(second.clone())]);
        acq.run();

        // Both sessions were read to exhaustion, then the script ran out
        assert_eq!(first.fetches(), 3);
        assert_eq!(second.fetches(), 2);
        assert_eq!(acq.connector.attempts, 3);

        let sink = acq.into_sink();
        assert_eq!(sink.named("sonic3d.temp").count(), 2);
        assert_eq!(
            statuses(&sink),
            vec![
                "connected".to_string(),
                "Malformed record: expected at least 4 payload fields, got 0".to_string(),
                "Connection closed by peer".to_string(),
                "connected".to_string(),
                "Connection closed by peer".to_string(),
                "script exhausted".to_string(),
            ]
        );
    }

    #[test]
    fn test_stopped_loop_does_not_connect() {
        let mut acq = acquisition(vec![Ok(MockTransport::new())]);
        acq.running.store(false, Ordering::Relaxed);

        acq.run();
        assert_eq!(acq.connector.attempts, 0);
        assert!(acq.sink().messages().is_empty());
    }
}
