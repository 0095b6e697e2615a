//! Target processors and their address widths.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{Result, ServiceError};

/// Width of a RAM address on the target (`uc_width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressWidth {
    /// 16-bit cores, 2-byte addresses.
    Bits16,
    /// 32-bit cores, 4-byte addresses.
    Bits32,
}

impl AddressWidth {
    /// Address size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            AddressWidth::Bits16 => 2,
            AddressWidth::Bits32 => 4,
        }
    }

    pub const fn max_address(self) -> u32 {
        match self {
            AddressWidth::Bits16 => u16::MAX as u32,
            AddressWidth::Bits32 => u32::MAX,
        }
    }

    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            2 => Some(AddressWidth::Bits16),
            4 => Some(AddressWidth::Bits32),
            _ => None,
        }
    }

    /// Append `address` little-endian in this width.
    pub(crate) fn put_address(self, address: u32, dst: &mut BytesMut) -> Result<()> {
        if address > self.max_address() {
            return Err(ServiceError::invalid(format!(
                "address {address:#x} does not fit a {}-byte target address",
                self.bytes()
            )));
        }
        dst.put_slice(&address.to_le_bytes()[..self.bytes()]);
        Ok(())
    }
}

/// A processor the monitor firmware identifies itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Processor {
    pub id: u16,
    pub name: &'static str,
    pub width: AddressWidth,
}

const PROCESSORS: &[(u16, &str, AddressWidth)] = &[
    (0x8210, "GENERIC_MICROCHIP_DSPIC", AddressWidth::Bits16),
    (0x8230, "GENERIC_MICROCHIP_PIC24", AddressWidth::Bits16),
    (0x0221, "DSPIC33FJ256MC710", AddressWidth::Bits16),
    (0x0222, "DSPIC33FJ128MC706", AddressWidth::Bits16),
    (0x0223, "DSPIC33FJ128MC506", AddressWidth::Bits16),
    (0x0224, "DSPIC33FJ64GS610", AddressWidth::Bits16),
    (0x0225, "DSPIC33FJ64GS406", AddressWidth::Bits16),
    (0x0226, "DSPIC33FJ12GP202", AddressWidth::Bits16),
    (0x0228, "DSPIC33FJ128MC802", AddressWidth::Bits16),
    (0x0231, "DSPIC33EP256MC506", AddressWidth::Bits16),
    (0x0232, "DSPIC33EP128GP502", AddressWidth::Bits16),
    (0x0233, "DSPIC33EP32GP502", AddressWidth::Bits16),
    (0x0234, "DSPIC33EP256GP502", AddressWidth::Bits16),
    (0x0235, "DSPIC33EP256MC502", AddressWidth::Bits16),
    (0x0236, "DSPIC33EP128MC202", AddressWidth::Bits16),
    (0x0237, "DSPIC33EP128GM604", AddressWidth::Bits16),
    (0x8220, "GENERIC_MICROCHIP_PIC32", AddressWidth::Bits32),
    (0x8320, "GENERIC_ARM_ARMV6", AddressWidth::Bits32),
    (0x8310, "GENERIC_ARM_ARMV7", AddressWidth::Bits32),
    (0x0241, "PIC32MZ2048EC", AddressWidth::Bits32),
    (0x0251, "PIC32MX170F256", AddressWidth::Bits32),
];

impl Processor {
    /// Look up a processor id reported by Device Info.
    pub fn lookup(id: u16) -> Option<Processor> {
        PROCESSORS
            .iter()
            .find(|(known, _, _)| *known == id)
            .map(|&(id, name, width)| Processor { id, name, width })
    }
}
