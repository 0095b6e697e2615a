use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const READ_CHUNK_SIZE: usize = 512;

/// Smallest read timeout handed to the OS. A zero timeout is rejected by
/// `set_read_timeout`.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A std stream that supports bounded blocking reads.
pub trait TimeoutStream: Read + Write + Send {
    /// Set the read timeout on the underlying stream.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Shut the stream down in both directions.
    fn shutdown(&self) -> std::io::Result<()>;
}

impl TimeoutStream for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

#[cfg(unix)]
impl TimeoutStream for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both)
    }
}

/// [`Transport`] over any [`TimeoutStream`].
pub struct StreamTransport<S> {
    inner: Option<S>,
    read_timeout: Option<Duration>,
    label: &'static str,
}

impl<S: TimeoutStream> StreamTransport<S> {
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        Self::with_label(stream, "stream")
    }

    /// Wrap a stream with an explicit diagnostic name.
    pub fn with_label(stream: S, label: &'static str) -> Self {
        Self {
            inner: Some(stream),
            read_timeout: None,
            label,
        }
    }

    /// Borrow the underlying stream, if still open.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// True until [`Transport::close`] was called or the peer hung up.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn stream(&mut self) -> Result<&mut S> {
        self.inner.as_mut().ok_or(TransportError::Closed)
    }

    fn apply_read_timeout(&mut self, max_wait: Duration) -> Result<()> {
        let wanted = Some(max_wait.max(MIN_READ_TIMEOUT));
        if self.read_timeout != wanted {
            self.stream()?.set_read_timeout(wanted)?;
            self.read_timeout = wanted;
        }
        Ok(())
    }
}

impl StreamTransport<TcpStream> {
    /// Connect to an LNet device bridged over TCP.
    pub fn connect_tcp(addr: impl std::net::ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected tcp transport");
        Ok(Self::with_label(stream, "tcp"))
    }
}

impl<S: TimeoutStream> Transport for StreamTransport<S> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        let mut offset = 0usize;
        while offset < data.len() {
            match stream.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn read_available(&mut self, max_wait: Duration) -> Result<Bytes> {
        self.apply_read_timeout(max_wait)?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream()?.read(&mut chunk) {
                Ok(0) => {
                    debug!(transport = self.label, "remote end closed the stream");
                    self.inner = None;
                    return Err(TransportError::Closed);
                }
                Ok(n) => return Ok(Bytes::copy_from_slice(&chunk[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Err(TransportError::Timeout(max_wait));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.inner.take() {
            debug!(transport = self.label, "closing stream transport");
            match stream.shutdown() {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotConnected => {}
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.label
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("label", &self.label)
            .field("open", &self.inner.is_some())
            .finish()
    }
}
