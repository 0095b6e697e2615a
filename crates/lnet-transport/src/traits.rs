use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TransportError};

/// A connected byte link to one LNet device or bus.
///
/// This is the only capability the protocol engine needs from a physical
/// transport. Implementations must be `Send` so a session owning one can be
/// shared between threads.
pub trait Transport: Send {
    /// Write the whole buffer to the link (blocking).
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Return the bytes that arrive within `max_wait`.
    ///
    /// Returns as soon as at least one byte is available. Returns
    /// `Err(TransportError::Timeout)` when nothing arrived in time and
    /// `Err(TransportError::Closed)` once the link is gone.
    fn read_available(&mut self, max_wait: Duration) -> Result<Bytes>;

    /// Release the link. Further calls fail with [`TransportError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Drop pending input until the link stays quiet for `quiet`, but for
    /// no longer than `limit` in total.
    ///
    /// At least one read is made, so a zero `limit` takes whatever is
    /// already pending without waiting. Returns the number of discarded
    /// bytes.
    fn discard_input(&mut self, quiet: Duration, limit: Duration) -> Result<usize> {
        let deadline = Instant::now() + limit;
        let mut discarded = 0usize;
        loop {
            let wait = quiet.min(deadline.saturating_duration_since(Instant::now()));
            match self.read_available(wait) {
                Ok(bytes) if bytes.is_empty() => return Ok(discarded),
                Ok(bytes) => {
                    trace!(len = bytes.len(), "discarding stale input");
                    discarded += bytes.len();
                }
                Err(TransportError::Timeout(_)) => return Ok(discarded),
                Err(err) => return Err(err),
            }
            if Instant::now() >= deadline {
                trace!(discarded, "input still arriving at discard limit");
                return Ok(discarded);
            }
        }
    }

    /// Transport name for diagnostics.
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_available(&mut self, max_wait: Duration) -> Result<Bytes> {
        (**self).read_available(max_wait)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn discard_input(&mut self, quiet: Duration, limit: Duration) -> Result<usize> {
        (**self).discard_input(quiet, limit)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
