use lnet_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The DATA section does not fit the single-byte SIZE field.
    #[error("frame data too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A reserved byte was not followed by the fill byte.
    #[error("invalid escape: reserved byte {byte:#04x} followed by {found:#04x}")]
    InvalidEscape { byte: u8, found: u8 },

    /// The escaped input ended between a reserved byte and its fill byte.
    #[error("escaped data ends inside an escape sequence")]
    TruncatedEscape,

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (computed {expected:#04x}, received {found:#04x})")]
    ChecksumMismatch { expected: u8, found: u8 },

    /// The SIZE field is too small for the frame kind.
    #[error("invalid frame size {size} (min {min})")]
    InvalidSize { size: u8, min: usize },

    /// The underlying transport failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// True for malformed or corrupt input. The stream has already been
    /// resynchronized past the bad bytes, so reading can simply continue.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidEscape { .. }
                | FrameError::TruncatedEscape
                | FrameError::ChecksumMismatch { .. }
                | FrameError::InvalidSize { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
