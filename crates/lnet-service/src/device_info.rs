//! Device Info reply (service 0).
//!
//! The monitor answers with a fixed 44-byte block, little-endian:
//!
//! | Field | Size |
//! |---|---|
//! | monitor version | 2 |
//! | application version | 2 |
//! | max target size | 1 |
//! | processor id | 2 |
//! | monitor date, time | 9 + 4 ASCII |
//! | application date, time | 9 + 4 ASCII |
//! | DSP state | 1 |
//! | last event type | 2 |
//! | last event id | 4 |
//! | parameter table address | 4 |

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

use crate::error::{Result, ServiceError};
use crate::id::ServiceId;
use crate::target::{AddressWidth, Processor};

const DATE_LEN: usize = 9;
const TIME_LEN: usize = 4;

/// Execution state of the firmware as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DspState {
    /// Monitor runs, no application.
    Monitor,
    ApplicationLoaded,
    Idle,
    Init,
    RunningPowerOff,
    RunningPowerOn,
    Unknown(u8),
}

impl DspState {
    pub fn as_u8(self) -> u8 {
        match self {
            DspState::Monitor => 0,
            DspState::ApplicationLoaded => 1,
            DspState::Idle => 2,
            DspState::Init => 3,
            DspState::RunningPowerOff => 4,
            DspState::RunningPowerOn => 5,
            DspState::Unknown(raw) => raw,
        }
    }
}

impl From<u8> for DspState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => DspState::Monitor,
            1 => DspState::ApplicationLoaded,
            2 => DspState::Idle,
            3 => DspState::Init,
            4 => DspState::RunningPowerOff,
            5 => DspState::RunningPowerOn,
            other => DspState::Unknown(other),
        }
    }
}

impl fmt::Display for DspState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DspState::Monitor => "monitor running, no application",
            DspState::ApplicationLoaded => "application loaded",
            DspState::Idle => "application idle",
            DspState::Init => "application initializing",
            DspState::RunningPowerOff => "application running, power off",
            DspState::RunningPowerOn => "application running, power on",
            DspState::Unknown(raw) => return write!(f, "unknown DSP state ({raw})"),
        };
        f.write_str(text)
    }
}

/// Identity and state of the target, from the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub monitor_version: u16,
    pub app_version: u16,
    pub max_target_size: u8,
    pub processor_id: u16,
    pub monitor_date: String,
    pub monitor_time: String,
    pub app_date: String,
    pub app_time: String,
    pub dsp_state: DspState,
    pub event_type: u16,
    pub event_id: u32,
    pub table_struct_address: u32,
}

impl DeviceInfo {
    /// Exact payload length of a Device Info reply.
    pub const ENCODED_LEN: usize = 44;

    /// Decode a Device Info reply payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != Self::ENCODED_LEN {
            return Err(ServiceError::PayloadLength {
                service: ServiceId::DeviceInfo,
                expected: Self::ENCODED_LEN,
                actual: payload.len(),
            });
        }

        let mut buf = payload;
        let monitor_version = buf.get_u16_le();
        let app_version = buf.get_u16_le();
        let max_target_size = buf.get_u8();
        let processor_id = buf.get_u16_le();
        let monitor_date = take_ascii(&mut buf, DATE_LEN);
        let monitor_time = take_ascii(&mut buf, TIME_LEN);
        let app_date = take_ascii(&mut buf, DATE_LEN);
        let app_time = take_ascii(&mut buf, TIME_LEN);
        let dsp_state = DspState::from(buf.get_u8());
        let event_type = buf.get_u16_le();
        let event_id = buf.get_u32_le();
        let table_struct_address = buf.get_u32_le();

        Ok(Self {
            monitor_version,
            app_version,
            max_target_size,
            processor_id,
            monitor_date,
            monitor_time,
            app_date,
            app_time,
            dsp_state,
            event_type,
            event_id,
            table_struct_address,
        })
    }

    /// Append the 44-byte wire form. Strings are cut or NUL-padded to
    /// their field length.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(Self::ENCODED_LEN);
        dst.put_u16_le(self.monitor_version);
        dst.put_u16_le(self.app_version);
        dst.put_u8(self.max_target_size);
        dst.put_u16_le(self.processor_id);
        put_ascii(dst, &self.monitor_date, DATE_LEN);
        put_ascii(dst, &self.monitor_time, TIME_LEN);
        put_ascii(dst, &self.app_date, DATE_LEN);
        put_ascii(dst, &self.app_time, TIME_LEN);
        dst.put_u8(self.dsp_state.as_u8());
        dst.put_u16_le(self.event_type);
        dst.put_u32_le(self.event_id);
        dst.put_u32_le(self.table_struct_address);
    }

    /// The processor, if its id is a known one.
    pub fn processor(&self) -> Option<Processor> {
        Processor::lookup(self.processor_id)
    }

    /// Address width of the target (`uc_width`).
    pub fn address_width(&self) -> Result<AddressWidth> {
        self.processor()
            .map(|p| p.width)
            .ok_or(ServiceError::AddressWidthUnknown {
                processor_id: self.processor_id,
            })
    }
}

fn take_ascii(buf: &mut &[u8], len: usize) -> String {
    let current: &[u8] = *buf;
    let (field, rest) = current.split_at(len);
    *buf = rest;
    String::from_utf8_lossy(field)
        .trim_end_matches('\0')
        .to_string()
}

fn put_ascii(dst: &mut BytesMut, text: &str, len: usize) {
    let bytes = text.as_bytes();
    let used = bytes.len().min(len);
    dst.put_slice(&bytes[..used]);
    dst.put_bytes(0, len - used);
}
