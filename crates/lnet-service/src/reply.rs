use bytes::Bytes;
use lnet_frame::Frame;
use tracing::trace;

use crate::device_info::DeviceInfo;
use crate::error::{Result, ServiceError};
use crate::id::ServiceId;
use crate::request::Request;
use crate::scope::ScopeData;
use crate::status::DeviceStatus;

/// A reply frame from the device, before service decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub node: u8,
    pub service: ServiceId,
    pub status: DeviceStatus,
    pub payload: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }
}

impl From<Frame> for Response {
    fn from(frame: Frame) -> Self {
        Self {
            node: frame.node,
            service: ServiceId::from(frame.service_id),
            status: DeviceStatus(frame.error_status.unwrap_or(0)),
            payload: frame.payload,
        }
    }
}

/// Decoded payload of a successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceReply {
    DeviceInfo(DeviceInfo),
    GetRam(Bytes),
    PutRam,
    /// Raw acknowledgement bytes; usually empty.
    SaveParameter(Bytes),
    LoadParameter(ScopeData),
    Reboot,
    /// A service this crate has no codec for.
    Unknown { service_id: u8, payload: Bytes },
}

impl ServiceReply {
    /// Decode the reply to `request`.
    ///
    /// The status byte is not looked at here; callers check
    /// [`Response::is_success`] first.
    pub fn decode(request: &Request, response: &Response) -> Result<Self> {
        let expected = request.service_id();
        if response.service != expected {
            return Err(ServiceError::UnexpectedService {
                expected,
                found: response.service,
            });
        }

        match request {
            Request::GetRam(req) => {
                let expected = req.length as usize;
                if response.payload.len() != expected {
                    return Err(ServiceError::PayloadLength {
                        service: ServiceId::GetRam,
                        expected,
                        actual: response.payload.len(),
                    });
                }
                Ok(ServiceReply::GetRam(response.payload.clone()))
            }
            Request::PutRam(req) => match response.payload.as_ref() {
                [] => Ok(ServiceReply::PutRam),
                [echoed] if *echoed as usize == req.data.len() => Ok(ServiceReply::PutRam),
                [echoed] => Err(ServiceError::MalformedPayload {
                    service: ServiceId::PutRam,
                    reason: format!(
                        "device acknowledged {echoed} bytes, {} were sent",
                        req.data.len()
                    ),
                }),
                other => Err(ServiceError::PayloadLength {
                    service: ServiceId::PutRam,
                    expected: 1,
                    actual: other.len(),
                }),
            },
            _ => Self::from_response(response),
        }
    }

    /// Decode a reply by its service id alone.
    ///
    /// Get RAM payloads are passed through unchecked since the requested
    /// length is unknown here.
    pub fn from_response(response: &Response) -> Result<Self> {
        let payload = &response.payload;
        Ok(match response.service {
            ServiceId::DeviceInfo => ServiceReply::DeviceInfo(DeviceInfo::decode(payload)?),
            ServiceId::GetRam => ServiceReply::GetRam(payload.clone()),
            ServiceId::PutRam => ServiceReply::PutRam,
            ServiceId::SaveParameter => ServiceReply::SaveParameter(payload.clone()),
            ServiceId::LoadParameter => ServiceReply::LoadParameter(ScopeData::decode(payload)?),
            ServiceId::Reboot => ServiceReply::Reboot,
            ServiceId::Unknown(service_id) => {
                trace!(service_id, len = payload.len(), "reply to unknown service");
                ServiceReply::Unknown {
                    service_id,
                    payload: payload.clone(),
                }
            }
        })
    }

    pub fn service_id(&self) -> ServiceId {
        match self {
            ServiceReply::DeviceInfo(_) => ServiceId::DeviceInfo,
            ServiceReply::GetRam(_) => ServiceId::GetRam,
            ServiceReply::PutRam => ServiceId::PutRam,
            ServiceReply::SaveParameter(_) => ServiceId::SaveParameter,
            ServiceReply::LoadParameter(_) => ServiceId::LoadParameter,
            ServiceReply::Reboot => ServiceId::Reboot,
            ServiceReply::Unknown { service_id, .. } => ServiceId::Unknown(*service_id),
        }
    }
}
