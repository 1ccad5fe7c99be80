use std::io;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::config::ServerAddress;

/// Transport for encoded wire lines.
///
/// One call to [emit](MetricSink::emit) carries exactly one metric line;
/// there is no acknowledgment and no retry. Test doubles substitute this
/// trait to observe emission without network I/O.
pub trait MetricSink: Send + Sync {
    /// Hand one encoded line to the transport, returning the number of
    /// bytes written.
    fn emit(&self, line: &str) -> io::Result<usize>;
}

impl<S: MetricSink + ?Sized> MetricSink for Arc<S> {
    fn emit(&self, line: &str) -> io::Result<usize> {
        (**self).emit(line)
    }
}

/// Fire-and-forget UDP transport, addressed once at construction.
///
/// The socket is owned and released exactly once when the sink is
/// dropped.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    /// Bind an ephemeral local socket and associate it with the server
    /// address. Name resolution happens here, not per send.
    pub fn connect(server: &ServerAddress) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        socket.connect((server.host(), server.port()))?;
        Ok(Self { socket })
    }
}

impl MetricSink for UdpSink {
    fn emit(&self, line: &str) -> io::Result<usize> {
        let written = self.socket.send(line.as_bytes())?;
        trace!("Sent {written} bytes to statsd");
        Ok(written)
    }
}

/// Discards every line.
#[derive(Debug, Default)]
pub struct NopSink;

impl MetricSink for NopSink {
    fn emit(&self, line: &str) -> io::Result<usize> {
        let _ = line;
        Ok(0)
    }
}

/// Records every emitted line for later assertions. Share it with the
/// client through an [Arc] to inspect what was sent.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<String>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl MetricSink for CaptureSink {
    fn emit(&self, line: &str) -> io::Result<usize> {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
        Ok(line.len())
    }
}
