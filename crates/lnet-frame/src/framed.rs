use std::time::{Duration, Instant};

use bytes::BytesMut;
use lnet_transport::{Transport, TransportError};
use tracing::{debug, trace};

use crate::codec::{decode_frame, encode_frame, Frame, FrameKind};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Sends and receives whole frames over a [`Transport`].
///
/// Handles partial reads internally. Receiving returns the first complete
/// frame, or the first corruption error (after the bad bytes have been
/// dropped), so callers decide whether to keep waiting.
pub struct FramedTransport<T> {
    inner: T,
    read_buf: BytesMut,
    write_buf: BytesMut,
    kind: FrameKind,
}

impl<T: Transport> FramedTransport<T> {
    /// Master side: receives responses.
    pub fn new(inner: T) -> Self {
        Self::with_kind(inner, FrameKind::Response)
    }

    /// Choose which frame kind is expected on the receive side.
    pub fn with_kind(inner: T, kind: FrameKind) -> Self {
        Self {
            inner,
            read_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            kind,
        }
    }

    /// Encode and send a request frame.
    pub fn send(&mut self, node: u8, service_id: u8, payload: &[u8]) -> Result<()> {
        self.write_buf.clear();
        encode_frame(node, service_id, None, payload, &mut self.write_buf)?;
        self.flush_frame(node, service_id)
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_buf.clear();
        frame.encode(&mut self.write_buf)?;
        self.flush_frame(frame.node, frame.service_id)
    }

    fn flush_frame(&mut self, node: u8, service_id: u8) -> Result<()> {
        trace!(bytes = ?self.write_buf.as_ref(), "frame out");
        self.inner.write(&self.write_buf)?;
        debug!(node, service_id, len = self.write_buf.len(), "sent frame");
        Ok(())
    }

    /// Read the next frame, waiting at most `timeout`.
    pub fn recv_frame(&mut self, timeout: Duration) -> Result<Frame> {
        self.recv_frame_until(Instant::now() + timeout)
    }

    /// Read the next frame, waiting until `deadline`.
    ///
    /// Returns `FrameError::Transport(TransportError::Timeout)` once the
    /// deadline passes without a complete frame.
    pub fn recv_frame_until(&mut self, deadline: Instant) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.read_buf, self.kind)? {
                debug!(
                    node = frame.node,
                    service_id = frame.service_id,
                    status = ?frame.error_status,
                    len = frame.payload.len(),
                    "received frame"
                );
                return Ok(frame);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FrameError::Transport(TransportError::Timeout(
                    Duration::ZERO,
                )));
            }

            let chunk = self.inner.read_available(deadline - now)?;
            trace!(bytes = ?chunk.as_ref(), "bytes in");
            self.read_buf.extend_from_slice(&chunk);
        }
    }

    /// Drop buffered bytes and anything the link delivers until it stays
    /// quiet for `quiet`, spending at most `limit`.
    ///
    /// Returns the number of bytes dropped.
    pub fn discard_input(&mut self, quiet: Duration, limit: Duration) -> Result<usize> {
        let buffered = self.read_buf.len();
        self.read_buf.clear();
        let drained = self.inner.discard_input(quiet, limit)?;
        if buffered + drained > 0 {
            debug!(buffered, drained, "discarded stale input");
        }
        Ok(buffered + drained)
    }

    /// Bytes received but not yet parsed into a frame.
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Close the underlying transport.
    pub fn close(&mut self) -> Result<()> {
        self.read_buf.clear();
        self.inner.close()?;
        Ok(())
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the framed transport and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
