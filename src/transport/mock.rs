//! Mock transport for testing

use super::Transport;
use super::framer::{CRLF, LineFramer};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

/// Mock transport replaying scripted receives through a real [`LineFramer`]
///
/// Clones share one script, so a test can keep a handle after boxing the
/// transport into a connection. An exhausted script behaves like a peer that
/// closed the socket.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

enum Step {
    Chunk(Vec<u8>),
    Fail(ErrorKind),
}

struct MockTransportInner {
    script: VecDeque<Step>,
    framer: LineFramer,
    fetches: usize,
}

impl MockTransport {
    /// Create a new mock transport with CRLF framing
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                script: VecDeque::new(),
                framer: LineFramer::new(CRLF, 4096),
                fetches: 0,
            })),
        }
    }

    /// Queue one receive returning `data`
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().script.push_back(Step::Chunk(data.to_vec()));
    }

    /// Queue one receive failing with an I/O error of `kind`
    pub fn inject_error(&self, kind: ErrorKind) {
        self.lock().script.push_back(Step::Fail(kind));
    }

    /// Number of `fetch_line` calls so far
    pub fn fetches(&self) -> usize {
        self.lock().fetches
    }

    /// Bytes buffered but not yet returned as a line
    pub fn pending(&self) -> Vec<u8> {
        self.lock().framer.pending().to_vec()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
        // A panicking test thread must not hide the script from others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MockTransport {
    fn fetch_line(&mut self) -> Result<Vec<u8>> {
        let mut guard = self.lock();
        let MockTransportInner {
            script,
            framer,
            fetches,
        } = &mut *guard;
        *fetches += 1;

        framer.next_line(|chunk| match script.pop_front() {
            Some(Step::Chunk(data)) => {
                let n = data.len().min(chunk.len());
                chunk[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Step::Fail(kind)) => Err(Error::Io(kind.into())),
            None => Ok(0),
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
