use std::time::Duration;

use lnet_frame::FrameError;
use lnet_service::{DeviceStatus, ServiceError, ServiceId};
use lnet_transport::TransportError;

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No valid reply arrived in time. The session stays usable.
    #[error("no reply from node {node} to {service} within {timeout:?}")]
    Timeout {
        node: u8,
        service: ServiceId,
        timeout: Duration,
    },

    /// The device answered with a nonzero error status.
    #[error("device rejected {service}: {status}")]
    Device {
        service: ServiceId,
        status: DeviceStatus,
    },

    /// Request encoding or reply decoding failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Frame encoding failed.
    #[error("frame error: {0}")]
    Frame(#[source] FrameError),

    /// The transport failed or the device hung up.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session was closed.
    #[error("session closed")]
    Closed,

    /// The blocking task running the exchange was cancelled or panicked.
    #[error("request task cancelled")]
    Cancelled,
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }

    /// True for well-formed replies that do not fit the request.
    pub fn is_protocol(&self) -> bool {
        matches!(self, SessionError::Service(err) if err.is_protocol())
    }
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Transport(err) => SessionError::Transport(err),
            other => SessionError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
