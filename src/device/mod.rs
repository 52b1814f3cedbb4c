//! Device connection: one transport plus the line protocol on top of it

mod record;
pub mod sonic3d;

pub use record::{FieldMap, ParsedRecord, parse_record};

use crate::config::{ConnectionConfig, LinkConfig};
use crate::error::{Error, Result};
use crate::transport::{self, Transport};

/// Result of one poll, split by what the caller should do next
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete, fully numeric record
    Record(ParsedRecord),
    /// The line was unusable; the transport is still fine
    Rejected(Error),
    /// The transport failed and must be re-established
    TransportLost(Error),
}

/// A live connection to the anemometer
pub struct DeviceConnection {
    transport: Box<dyn Transport>,
}

impl DeviceConnection {
    /// Establish the configured transport
    pub fn open(connection: &ConnectionConfig, link: &LinkConfig) -> Result<Self> {
        Ok(Self::new(transport::open(connection, link)?))
    }

    /// Wrap an already established transport
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Read one line and parse it into a record keyed by `fields`
    pub fn read_and_parse_data(&mut self, fields: &FieldMap) -> Result<ParsedRecord> {
        let line = self.transport.fetch_line()?;
        log::debug!("Raw line: {:?}", String::from_utf8_lossy(&line));
        parse_record(&line, fields)
    }

    /// Like [`read_and_parse_data`](Self::read_and_parse_data), with the
    /// error already classified
    pub fn poll(&mut self, fields: &FieldMap) -> ReadOutcome {
        match self.read_and_parse_data(fields) {
            Ok(record) => ReadOutcome::Record(record),
            Err(e) if e.is_transport() => ReadOutcome::TransportLost(e),
            Err(e) => ReadOutcome::Rejected(e),
        }
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::io::ErrorKind;

    const LINE: &[u8] =
        b"010000320000000000000000000000;-0.001;-0.036;0.012;23.602;0.036;1.525;0.036;1.525\r\n";

    #[test]
    fn test_read_and_parse_data() {
        let mock = MockTransport::new();
        mock.inject_read(LINE);
        let mut device = DeviceConnection::new(Box::new(mock.clone()));

        let record = device.read_and_parse_data(&sonic3d::field_map()).unwrap();
        assert_eq!(record.get("U"), Some(-0.001));
        assert_eq!(record.get("V"), Some(-0.036));
        assert_eq!(record.get("W"), Some(0.012));
        assert_eq!(record.get("T"), Some(23.602));
    }

    #[test]
    fn test_line_split_across_receives() {
        let mock = MockTransport::new();
        mock.inject_read(&LINE[..20]);
        mock.inject_read(&LINE[20..LINE.len() - 1]);
        mock.inject_read(&LINE[LINE.len() - 1..]);
        mock.inject_read(b"S;1;2;3;4\r\nS;9");
        let mut device = DeviceConnection::new(Box::new(mock.clone()));
        let fields = sonic3d::field_map();

        assert_eq!(device.read_and_parse_data(&fields).unwrap().get("T"), Some(23.602));
        assert_eq!(device.read_and_parse_data(&fields).unwrap().get("T"), Some(4.0));
        assert_eq!(mock.pending(), b"S;9");
    }

    #[test]
    fn test_poll_classifies_errors() {
        let mock = MockTransport::new();
        mock.inject_read(b"S;1;2\r\n");
        mock.inject_read(b"S;1;2;x;4\r\n");
        mock.inject_read(LINE);
        mock.inject_error(ErrorKind::ConnectionReset);
        let mut device = DeviceConnection::new(Box::new(mock.clone()));
        let fields = sonic3d::field_map();

        assert!(matches!(
            device.poll(&fields),
            ReadOutcome::Rejected(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            device.poll(&fields),
            ReadOutcome::Rejected(Error::InvalidValue { .. })
        ));
        assert!(matches!(device.poll(&fields), ReadOutcome::Record(_)));
        assert!(matches!(
            device.poll(&fields),
            ReadOutcome::TransportLost(Error::Io(_))
        ));
        // Script exhausted: the peer is gone
        assert!(matches!(
            device.poll(&fields),
            ReadOutcome::TransportLost(Error::ConnectionClosed)
        ));
        assert_eq!(mock.fetches(), 5);
    }
}
