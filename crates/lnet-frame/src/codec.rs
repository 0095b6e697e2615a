use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::stuffing::{stuff, unstuff_exact, FILL, SYN};

/// Unescaped header: SYN (1) + SIZE (1) + NODE (1).
pub const HEADER_SIZE: usize = 3;

/// Trailing checksum length.
pub const CHECKSUM_SIZE: usize = 1;

/// Largest DATA section the SIZE byte can describe.
pub const MAX_DATA_SIZE: usize = u8::MAX as usize;

/// Which side of an exchange a frame comes from.
///
/// Responses carry an error status byte after the service id; requests do
/// not. The wire format gives no other way to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Master to device.
    Request,
    /// Device to master.
    Response,
}

impl FrameKind {
    /// Smallest valid SIZE value for this kind.
    pub fn min_data_size(self) -> usize {
        match self {
            FrameKind::Request => 1,
            FrameKind::Response => 2,
        }
    }
}

/// A decoded LNet frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Slave node the frame is addressed to or comes from.
    pub node: u8,
    /// Service id, first DATA byte.
    pub service_id: u8,
    /// Error status reported by the device. `None` for requests.
    pub error_status: Option<u8>,
    /// Service payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a request frame.
    pub fn request(node: u8, service_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            node,
            service_id,
            error_status: None,
            payload: payload.into(),
        }
    }

    /// Create a response frame.
    pub fn response(node: u8, service_id: u8, error_status: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            node,
            service_id,
            error_status: Some(error_status),
            payload: payload.into(),
        }
    }

    /// Request or response, judged by the presence of an error status.
    pub fn kind(&self) -> FrameKind {
        if self.error_status.is_some() {
            FrameKind::Response
        } else {
            FrameKind::Request
        }
    }

    /// Unescaped DATA length, the value carried in SIZE.
    pub fn data_size(&self) -> usize {
        1 + usize::from(self.error_status.is_some()) + self.payload.len()
    }

    /// Append the wire form of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(
            self.node,
            self.service_id,
            self.error_status,
            &self.payload,
            dst,
        )
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬──────┬──────────────────────────────────────┬──────────┐
/// │ SYN  │ SIZE │ NODE │ DATA (SIZE bytes, unescaped count)   │ CHECKSUM │
/// │ 0x55 │      │      │ service id · [error status] · payload│          │
/// └──────┴──────┴──────┴──────────────────────────────────────┴──────────┘
///          └────────── escaped: 0x55/0x02 followed by 0x00 ──────────────┘
/// ```
pub fn encode_frame(
    node: u8,
    service_id: u8,
    error_status: Option<u8>,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let data_size = 1 + usize::from(error_status.is_some()) + payload.len();
    if data_size > MAX_DATA_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: data_size,
            max: MAX_DATA_SIZE,
        });
    }
    let size = data_size as u8;

    let mut data = BytesMut::with_capacity(data_size);
    data.put_u8(service_id);
    if let Some(status) = error_status {
        data.put_u8(status);
    }
    data.put_slice(payload);

    let sum = checksum::compute(size, node, &data);

    dst.reserve(HEADER_SIZE + data_size + CHECKSUM_SIZE);
    dst.put_u8(SYN);
    stuff(&[size, node], dst);
    stuff(&data, dst);
    stuff(&[sum], dst);
    Ok(())
}

/// Result of one [`try_parse`] attempt.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A whole, checksum-valid frame.
    Complete(Frame),
    /// More bytes are needed. Nothing of the started frame was consumed.
    Incomplete,
    /// The frame at the head of the buffer is malformed. The consumed count
    /// skips to the next plausible `SYN`.
    Corrupt(FrameError),
}

enum ParseState {
    AwaitingSyn,
    ReadingSize {
        start: usize,
    },
    ReadingBody {
        start: usize,
        body: usize,
        size: u8,
        node: u8,
    },
    Verifying {
        start: usize,
        end: usize,
        size: u8,
        node: u8,
        data: BytesMut,
        checksum: u8,
    },
}

/// Try to parse one frame from the head of `buf`.
///
/// Returns the outcome and how many bytes of `buf` the caller should drop.
/// Noise in front of the first `SYN` is always dropped.
pub fn try_parse(buf: &[u8], kind: FrameKind) -> (ParseOutcome, usize) {
    let mut state = ParseState::AwaitingSyn;
    loop {
        state = match state {
            ParseState::AwaitingSyn => match find_syn(buf, 0) {
                Some(start) => ParseState::ReadingSize { start },
                None => return (ParseOutcome::Incomplete, buf.len()),
            },
            ParseState::ReadingSize { start } => match unstuff_exact(&buf[start + 1..], 2) {
                Ok(Some((header, used))) => {
                    let (size, node) = (header[0], header[1]);
                    if usize::from(size) < kind.min_data_size() {
                        return corrupt(
                            buf,
                            start,
                            FrameError::InvalidSize {
                                size,
                                min: kind.min_data_size(),
                            },
                        );
                    }
                    ParseState::ReadingBody {
                        start,
                        body: start + 1 + used,
                        size,
                        node,
                    }
                }
                Ok(None) => return (ParseOutcome::Incomplete, start),
                Err(err) => return corrupt(buf, start, err),
            },
            ParseState::ReadingBody {
                start,
                body,
                size,
                node,
            } => match unstuff_exact(&buf[body..], usize::from(size) + CHECKSUM_SIZE) {
                Ok(Some((mut data, used))) => {
                    let checksum = data[usize::from(size)];
                    data.truncate(usize::from(size));
                    ParseState::Verifying {
                        start,
                        end: body + used,
                        size,
                        node,
                        data,
                        checksum,
                    }
                }
                Ok(None) => return (ParseOutcome::Incomplete, start),
                Err(err) => return corrupt(buf, start, err),
            },
            ParseState::Verifying {
                start,
                end,
                size,
                node,
                data,
                checksum,
            } => {
                let expected = checksum::compute(size, node, &data);
                if expected != checksum {
                    return corrupt(
                        buf,
                        start,
                        FrameError::ChecksumMismatch {
                            expected,
                            found: checksum,
                        },
                    );
                }
                return (ParseOutcome::Complete(split_data(node, data, kind)), end);
            }
        };
    }
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. On corruption the
/// malformed prefix is consumed before the error is returned, so the next
/// call starts at the following frame candidate.
pub fn decode_frame(src: &mut BytesMut, kind: FrameKind) -> Result<Option<Frame>> {
    let (outcome, consumed) = try_parse(src, kind);
    src.advance(consumed);
    match outcome {
        ParseOutcome::Complete(frame) => Ok(Some(frame)),
        ParseOutcome::Incomplete => Ok(None),
        ParseOutcome::Corrupt(err) => Err(err),
    }
}

fn corrupt(buf: &[u8], start: usize, err: FrameError) -> (ParseOutcome, usize) {
    let next = find_syn(buf, start + 1).unwrap_or(buf.len());
    (ParseOutcome::Corrupt(err), next)
}

/// Position of the next byte that can start a frame.
///
/// `SYN` followed by the fill byte is an escaped data byte (or a frame with
/// SIZE 0, which is never valid), so it is skipped.
fn find_syn(buf: &[u8], from: usize) -> Option<usize> {
    (from..buf.len()).find(|&i| buf[i] == SYN && buf.get(i + 1) != Some(&FILL))
}

fn split_data(node: u8, data: BytesMut, kind: FrameKind) -> Frame {
    let mut data = data.freeze();
    let service_id = data.get_u8();
    let error_status = match kind {
        FrameKind::Request => None,
        FrameKind::Response => Some(data.get_u8()),
    };
    Frame {
        node,
        service_id,
        error_status,
        payload: data,
    }
}
