use crate::id::ServiceId;

/// Errors raised while encoding service requests or decoding replies.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A request argument is out of range for the target or the frame.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The reply payload does not have the length the service defines.
    #[error("{service} reply payload has {actual} bytes, expected {expected}")]
    PayloadLength {
        service: ServiceId,
        expected: usize,
        actual: usize,
    },

    /// The device answered a different service than the one requested.
    #[error("unexpected reply: requested {expected}, device answered {found}")]
    UnexpectedService {
        expected: ServiceId,
        found: ServiceId,
    },

    /// The reply has the right length but inconsistent content.
    #[error("malformed {service} reply: {reason}")]
    MalformedPayload {
        service: ServiceId,
        reason: String,
    },

    /// RAM access needs the target address width, which is not known.
    #[error("address width unknown (processor id {processor_id:#06x})")]
    AddressWidthUnknown { processor_id: u16 },

    /// A scope setup could not be read from or written to JSON.
    #[error("scope setup JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// True when the device sent a well-formed frame that does not fit the
    /// request (wrong service, wrong payload shape).
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ServiceError::PayloadLength { .. }
                | ServiceError::UnexpectedService { .. }
                | ServiceError::MalformedPayload { .. }
        )
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
