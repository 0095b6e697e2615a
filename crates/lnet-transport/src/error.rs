use std::time::Duration;

/// Errors that can occur in LNet transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes arrived within the allowed wait.
    #[error("no data received within {0:?}")]
    Timeout(Duration),

    /// The transport has been closed, locally or by the remote end.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// True for [`TransportError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
