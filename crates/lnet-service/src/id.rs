use std::fmt;

use serde::Serialize;

/// Numeric service identifiers carried in the first DATA byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceId {
    DeviceInfo,
    GetRam,
    PutRam,
    SaveParameter,
    LoadParameter,
    Reboot,
    /// Any id this crate has no codec for.
    Unknown(u8),
}

impl ServiceId {
    pub const DEVICE_INFO: u8 = 0;
    pub const GET_RAM: u8 = 9;
    pub const PUT_RAM: u8 = 10;
    pub const SAVE_PARAMETER: u8 = 18;
    pub const LOAD_PARAMETER: u8 = 19;
    pub const REBOOT: u8 = 25;

    pub const fn as_u8(self) -> u8 {
        match self {
            ServiceId::DeviceInfo => Self::DEVICE_INFO,
            ServiceId::GetRam => Self::GET_RAM,
            ServiceId::PutRam => Self::PUT_RAM,
            ServiceId::SaveParameter => Self::SAVE_PARAMETER,
            ServiceId::LoadParameter => Self::LOAD_PARAMETER,
            ServiceId::Reboot => Self::REBOOT,
            ServiceId::Unknown(id) => id,
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, ServiceId::Unknown(_))
    }

    pub fn name(self) -> &'static str {
        match self {
            ServiceId::DeviceInfo => "device info",
            ServiceId::GetRam => "get ram",
            ServiceId::PutRam => "put ram",
            ServiceId::SaveParameter => "save parameter",
            ServiceId::LoadParameter => "load parameter",
            ServiceId::Reboot => "reboot",
            ServiceId::Unknown(_) => "unknown service",
        }
    }
}

impl From<u8> for ServiceId {
    fn from(id: u8) -> Self {
        match id {
            Self::DEVICE_INFO => ServiceId::DeviceInfo,
            Self::GET_RAM => ServiceId::GetRam,
            Self::PUT_RAM => ServiceId::PutRam,
            Self::SAVE_PARAMETER => ServiceId::SaveParameter,
            Self::LOAD_PARAMETER => ServiceId::LoadParameter,
            Self::REBOOT => ServiceId::Reboot,
            other => ServiceId::Unknown(other),
        }
    }
}

impl From<ServiceId> for u8 {
    fn from(id: ServiceId) -> Self {
        id.as_u8()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
