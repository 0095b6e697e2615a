//! Byte stuffing for everything that follows `SYN`.
//!
//! The frame start `0x55` and the control value `0x02` never appear bare
//! after `SYN`: each occurrence is followed by the fill byte `0x00`. The fill
//! byte does not count towards SIZE and is excluded from the checksum.

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Frame start marker.
pub const SYN: u8 = 0x55;

/// Second reserved value.
pub const CONTROL: u8 = 0x02;

/// Inserted after every reserved value.
pub const FILL: u8 = 0x00;

/// Returns true if `byte` must be escaped.
#[inline]
pub fn is_reserved(byte: u8) -> bool {
    byte == SYN || byte == CONTROL
}

/// Number of bytes `data` occupies once stuffed.
pub fn stuffed_len(data: &[u8]) -> usize {
    data.len() + data.iter().filter(|&&b| is_reserved(b)).count()
}

/// Append `data` to `dst`, escaping reserved values.
pub fn stuff(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(stuffed_len(data));
    for &byte in data {
        dst.put_u8(byte);
        if is_reserved(byte) {
            dst.put_u8(FILL);
        }
    }
}

/// Collapse a complete escaped sequence.
///
/// Returns the original bytes and the number of escaped bytes consumed,
/// which is always `escaped.len()`.
pub fn unstuff(escaped: &[u8]) -> Result<(BytesMut, usize)> {
    let mut out = BytesMut::with_capacity(escaped.len());
    let mut pos = 0usize;
    while pos < escaped.len() {
        let byte = escaped[pos];
        if is_reserved(byte) {
            match escaped.get(pos + 1) {
                Some(&FILL) => pos += 2,
                Some(&found) => return Err(FrameError::InvalidEscape { byte, found }),
                None => return Err(FrameError::TruncatedEscape),
            }
        } else {
            pos += 1;
        }
        out.put_u8(byte);
    }
    Ok((out, pos))
}

/// Collapse escaped input until `count` original bytes are recovered.
///
/// Returns `Ok(None)` when `escaped` holds fewer than `count` bytes so far.
/// Bytes past the recovered ones are left alone.
pub fn unstuff_exact(escaped: &[u8], count: usize) -> Result<Option<(BytesMut, usize)>> {
    let mut out = BytesMut::with_capacity(count);
    let mut pos = 0usize;
    while out.len() < count {
        let Some(&byte) = escaped.get(pos) else {
            return Ok(None);
        };
        if is_reserved(byte) {
            match escaped.get(pos + 1) {
                Some(&FILL) => pos += 2,
                Some(&found) => return Err(FrameError::InvalidEscape { byte, found }),
                None => return Ok(None),
            }
        } else {
            pos += 1;
        }
        out.put_u8(byte);
    }
    Ok(Some((out, pos)))
}
