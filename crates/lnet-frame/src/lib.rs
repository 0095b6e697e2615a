//! LNet wire framing.
//!
//! Every LNet message travels in one frame:
//! - `SYN` (`0x55`) marks the frame start
//! - `SIZE` counts the unescaped DATA bytes
//! - `NODE` addresses the target slave
//! - `DATA` holds the service id, the error status (responses only) and the payload
//! - a one-byte additive checksum closes the frame
//!
//! Reserved values after `SYN` are escaped with a fill byte so a receiver can
//! always find the next frame start. Partial input is handled by
//! [`try_parse`]; [`FramedTransport`] drives it over a
//! [`Transport`](lnet_transport::Transport).

pub mod checksum;
pub mod codec;
pub mod error;
pub mod framed;
pub mod stuffing;

pub use codec::{
    decode_frame, encode_frame, try_parse, Frame, FrameKind, ParseOutcome, CHECKSUM_SIZE,
    HEADER_SIZE, MAX_DATA_SIZE,
};
pub use error::{FrameError, Result};
pub use framed::FramedTransport;
pub use stuffing::{stuff, unstuff, unstuff_exact, CONTROL, FILL, SYN};
