//! Frame checksum.
//!
//! The checksum is the sum of `SYN`, `SIZE`, `NODE` and every DATA byte,
//! modulo 256, taken over the unescaped bytes. Results that would collide
//! with a reserved value are replaced by their bitwise complement:
//! `0x55` is sent as `0xAA` and `0x02` as `0xFD`.

use crate::stuffing::{CONTROL, SYN};

/// Compute the checksum of one frame.
pub fn compute(size: u8, node: u8, data: &[u8]) -> u8 {
    let sum = data
        .iter()
        .fold(SYN.wrapping_add(size).wrapping_add(node), |acc, &b| {
            acc.wrapping_add(b)
        });
    match sum {
        SYN | CONTROL => !sum,
        other => other,
    }
}

/// Check a received checksum against the frame contents.
pub fn verify(size: u8, node: u8, data: &[u8], checksum: u8) -> bool {
    compute(size, node, data) == checksum
}
