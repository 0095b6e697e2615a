use bytes::{BufMut, Bytes, BytesMut};
use lnet_frame::MAX_DATA_SIZE;

use crate::error::{Result, ServiceError};
use crate::id::ServiceId;
use crate::scope::{ScopeSetup, SCOPE_PARAMETER_ID};
use crate::target::AddressWidth;

/// Largest request payload: DATA minus the service id.
pub const MAX_REQUEST_PAYLOAD: usize = MAX_DATA_SIZE - 1;

/// Largest reply payload: DATA minus service id and error status.
pub const MAX_REPLY_PAYLOAD: usize = MAX_DATA_SIZE - 2;

/// Read `length` bytes starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRamRequest {
    pub address: u32,
    pub length: u8,
    /// Element size hint for the monitor; defaults to `length`.
    pub data_type: u8,
}

impl GetRamRequest {
    pub fn new(address: u32, length: u8) -> Self {
        Self {
            address,
            length,
            data_type: length,
        }
    }
}

/// Write `data` starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRamRequest {
    pub address: u32,
    pub data: Bytes,
}

/// A service request with a typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    DeviceInfo,
    GetRam(GetRamRequest),
    PutRam(PutRamRequest),
    SaveParameter(ScopeSetup),
    LoadParameter,
    /// Restart the target. No reply is expected.
    Reboot,
}

impl Request {
    pub fn get_ram(address: u32, length: u8) -> Self {
        Request::GetRam(GetRamRequest::new(address, length))
    }

    pub fn put_ram(address: u32, data: impl Into<Bytes>) -> Self {
        Request::PutRam(PutRamRequest {
            address,
            data: data.into(),
        })
    }

    pub fn service_id(&self) -> ServiceId {
        match self {
            Request::DeviceInfo => ServiceId::DeviceInfo,
            Request::GetRam(_) => ServiceId::GetRam,
            Request::PutRam(_) => ServiceId::PutRam,
            Request::SaveParameter(_) => ServiceId::SaveParameter,
            Request::LoadParameter => ServiceId::LoadParameter,
            Request::Reboot => ServiceId::Reboot,
        }
    }

    /// True for requests whose payload carries a target address.
    pub fn needs_address_width(&self) -> bool {
        matches!(self, Request::GetRam(_) | Request::PutRam(_))
    }

    /// Build the request payload.
    ///
    /// `width` is only consulted for RAM access and must be known for it.
    pub fn encode_payload(&self, width: Option<AddressWidth>) -> Result<Bytes> {
        let mut payload = BytesMut::new();
        match self {
            Request::DeviceInfo | Request::Reboot => {}
            Request::GetRam(req) => {
                let width = require_width(width)?;
                if req.length == 0 || req.length as usize > MAX_REPLY_PAYLOAD {
                    return Err(ServiceError::invalid(format!(
                        "get ram length must be 1..={MAX_REPLY_PAYLOAD}, got {}",
                        req.length
                    )));
                }
                width.put_address(req.address, &mut payload)?;
                payload.put_u8(req.length);
                payload.put_u8(req.data_type);
            }
            Request::PutRam(req) => {
                let width = require_width(width)?;
                let max = MAX_REQUEST_PAYLOAD - width.bytes() - 1;
                if req.data.is_empty() || req.data.len() > max {
                    return Err(ServiceError::invalid(format!(
                        "put ram data must be 1..={max} bytes on a {}-byte target, got {}",
                        width.bytes(),
                        req.data.len()
                    )));
                }
                width.put_address(req.address, &mut payload)?;
                // Bounded by `max` above.
                payload.put_u8(req.data.len() as u8);
                payload.put_slice(&req.data);
            }
            Request::SaveParameter(setup) => {
                payload.put_u16_le(SCOPE_PARAMETER_ID);
                setup.encode(&mut payload)?;
                if payload.len() > MAX_REQUEST_PAYLOAD {
                    return Err(ServiceError::invalid(format!(
                        "scope setup needs {} bytes, frame carries {MAX_REQUEST_PAYLOAD}",
                        payload.len()
                    )));
                }
            }
            Request::LoadParameter => payload.put_u16_le(SCOPE_PARAMETER_ID),
        }
        Ok(payload.freeze())
    }
}

fn require_width(width: Option<AddressWidth>) -> Result<AddressWidth> {
    width.ok_or_else(|| ServiceError::invalid("target address width is not known"))
}
