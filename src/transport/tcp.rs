//! TCP transport with login handshake
//!
//! The anemometer's network adapter exposes a plaintext login before it
//! starts streaming records:
//!
//! ```text
//! server: "login: "              client: "<username>\r\n"
//! server: "password: "           client: "<password>\r\n"
//! server: "Authentication successful\r\n"
//! server: "010000320000;-0.001;-0.036;0.012;23.602;...\r\n"  (repeats)
//! ```
//!
//! Prompts are not guaranteed to arrive in one segment, so every handshake
//! read accumulates into the same buffer the data framer uses. Anything the
//! server sends after the success line is therefore kept as the start of
//! the data stream.

use super::Transport;
use super::framer::{CHUNK_SIZE, CRLF, LineFramer, find};
use crate::config::LinkConfig;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Case-insensitive phrase that marks an accepted login
const AUTH_OK: &[u8] = b"authentication successful";

/// Characters a prompt may end with when no newline follows it
const PROMPT_ENDINGS: &[u8] = b":>?";

/// TCP transport for the anemometer's network adapter
pub struct TcpTransport {
    stream: TcpStream,
    framer: LineFramer,
    peer: String,
    read_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to `host:port` and log in
    ///
    /// Fails with [`Error::Authentication`] before any data is read if the
    /// server does not confirm the login.
    pub fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        link: &LinkConfig,
    ) -> Result<Self> {
        let peer = format!("{}:{}", host, port);
        let mut stream = connect_any(&peer, link.connect_timeout())?;
        let mut framer = LineFramer::new(CRLF, link.max_line_bytes);

        // Zero leaves the exchange unbounded, like connect_timeout
        let handshake_timeout = Some(link.handshake_timeout()).filter(|t| !t.is_zero());
        login(
            &mut stream,
            &mut framer,
            username,
            password,
            handshake_timeout,
        )?;

        // Zero would be rejected by set_read_timeout; None blocks
        let read_timeout = link.read_timeout().filter(|t| !t.is_zero());
        stream.set_read_timeout(read_timeout)?;

        log::info!("Connected to {} and authenticated as {}", peer, username);

        Ok(Self {
            stream,
            framer,
            peer,
            read_timeout,
        })
    }
}

impl Transport for TcpTransport {
    fn fetch_line(&mut self) -> Result<Vec<u8>> {
        let Self {
            stream,
            framer,
            read_timeout,
            ..
        } = self;
        let timeout = read_timeout.unwrap_or_default();
        framer.next_line(|chunk| receive(&mut *stream, chunk, timeout))
    }

    fn describe(&self) -> String {
        format!("tcp:{}", self.peer)
    }
}

/// Stream whose read bound can be tightened between receives
pub(crate) trait ReadBound: Read + Write {
    fn set_read_bound(&mut self, bound: Option<Duration>) -> std::io::Result<()>;
}

impl ReadBound for TcpStream {
    fn set_read_bound(&mut self, bound: Option<Duration>) -> std::io::Result<()> {
        self.set_read_timeout(bound)
    }
}

/// Try each resolved address in turn
fn connect_any(peer: &str, timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;

    for addr in peer.to_socket_addrs()? {
        match connect_one(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other(format!("No address resolved for {}", peer))))
}

fn connect_one(addr: &SocketAddr, timeout: Duration) -> Result<TcpStream> {
    if timeout.is_zero() {
        Ok(TcpStream::connect(addr)?)
    } else {
        Ok(TcpStream::connect_timeout(addr, timeout)?)
    }
}

/// One bounded receive, with socket timeouts mapped to [`Error::Timeout`]
fn receive<R: Read>(stream: &mut R, chunk: &mut [u8], timeout: Duration) -> Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(Error::Timeout(timeout));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Run the three-step login exchange
///
/// Generic over the stream so the exchange can be exercised without a
/// socket. `timeout` bounds the whole exchange: each receive may only wait
/// for what is left of it. `None` waits indefinitely.
pub(crate) fn login<S: ReadBound>(
    stream: &mut S,
    framer: &mut LineFramer,
    username: &str,
    password: &str,
    timeout: Option<Duration>,
) -> Result<()> {
    let deadline = timeout.map(|t| (Instant::now() + t, t));

    let prompt = read_until(stream, framer, deadline, prompt_end)?;
    log::debug!("Login prompt: {:?}", prompt.trim());
    stream.write_all(format!("{}\r\n", username).as_bytes())?;

    let prompt = read_until(stream, framer, deadline, prompt_end)?;
    log::debug!("Password prompt: {:?}", prompt.trim());
    stream.write_all(format!("{}\r\n", password).as_bytes())?;
    stream.flush()?;

    let response = read_until(stream, framer, deadline, auth_end);
    match response {
        Ok(text) if contains_ignore_case(text.as_bytes(), AUTH_OK) => {
            log::debug!("Login response: {:?}", text.trim());
            Ok(())
        }
        Ok(text) => Err(Error::Authentication(text.trim().to_string())),
        // Closed before confirming: whatever arrived is the rejection
        Err(Error::ConnectionClosed) if !framer.pending().is_empty() => {
            let text = String::from_utf8_lossy(framer.pending()).trim().to_string();
            framer.clear();
            Err(Error::Authentication(text))
        }
        Err(Error::ConnectionClosed) => Err(Error::Authentication(
            "connection closed before confirmation".to_string(),
        )),
        Err(e) => Err(e),
    }
}

/// Receive until `complete` finds the end of a message, then consume it
fn read_until<S, F>(
    stream: &mut S,
    framer: &mut LineFramer,
    deadline: Option<(Instant, Duration)>,
    complete: F,
) -> Result<String>
where
    S: ReadBound,
    F: Fn(&[u8]) -> Option<usize>,
{
    let mut chunk = [0u8; CHUNK_SIZE];

    loop {
        if let Some(end) = complete(framer.pending()) {
            let text = String::from_utf8_lossy(&framer.pending()[..end]).into_owned();
            framer.consume(end);
            return Ok(text);
        }

        let (bound, timeout) = match deadline {
            Some((at, timeout)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Error::Timeout(timeout));
                }
                (Some(remaining), timeout)
            }
            None => (None, Duration::ZERO),
        };
        stream.set_read_bound(bound)?;

        let read = receive(stream, &mut chunk, timeout)?;
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        framer.extend(&chunk[..read]);
    }
}

/// End of a prompt: through the first newline, or the whole buffer once it
/// ends in a prompt character
fn prompt_end(pending: &[u8]) -> Option<usize> {
    if let Some(pos) = find(pending, b"\n") {
        return Some(pos + 1);
    }
    match pending.trim_ascii_end().last() {
        Some(c) if PROMPT_ENDINGS.contains(c) => Some(pending.len()),
        _ => None,
    }
}

/// End of the login verdict
///
/// Success as soon as the phrase is buffered, through the end of its line
/// if that line is complete. Otherwise the first complete non-blank line is
/// the verdict.
fn auth_end(pending: &[u8]) -> Option<usize> {
    if let Some(pos) = find_ignore_case(pending, AUTH_OK) {
        let end = match find(&pending[pos..], b"\n") {
            Some(nl) => pos + nl + 1,
            None => pending.len(),
        };
        return Some(end);
    }

    let mut start = 0;
    while let Some(nl) = find(&pending[start..], b"\n") {
        let line = &pending[start..start + nl];
        if !line.trim_ascii().is_empty() {
            return Some(start + nl + 1);
        }
        start += nl + 1;
    }
    None
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    find_ignore_case(haystack, needle).is_some()
}
