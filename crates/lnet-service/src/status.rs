use std::fmt;

use serde::Serialize;

/// Error status byte reported by the device in every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceStatus(pub u8);

impl DeviceStatus {
    pub const OK: DeviceStatus = DeviceStatus(0);
    pub const CHECKSUM_ERROR: DeviceStatus = DeviceStatus(19);
    pub const FORMAT_ERROR: DeviceStatus = DeviceStatus(20);
    pub const SIZE_TOO_LARGE: DeviceStatus = DeviceStatus(21);
    pub const SERVICE_NOT_AVAILABLE: DeviceStatus = DeviceStatus(33);
    pub const INVALID_DSP_STATE: DeviceStatus = DeviceStatus(34);
    pub const FLASH_WRITE_ERROR: DeviceStatus = DeviceStatus(48);
    pub const FLASH_WRITE_PROTECTED: DeviceStatus = DeviceStatus(49);
    pub const INVALID_PARAMETER_ID: DeviceStatus = DeviceStatus(64);
    pub const INVALID_BLOCK_ID: DeviceStatus = DeviceStatus(65);
    pub const PARAMETER_LIMIT: DeviceStatus = DeviceStatus(66);
    pub const PARAMETER_TABLE_UNINITIALIZED: DeviceStatus = DeviceStatus(67);
    pub const POWER_ON_ERROR: DeviceStatus = DeviceStatus(80);

    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Monitor description of the code, if it is a documented one.
    pub fn description(self) -> Option<&'static str> {
        let text = match self.0 {
            0 => "No Error",
            19 => "Checksum Error",
            20 => "Format Error",
            21 => "Size too large",
            33 => "Service not available",
            34 => "Invalid DSP state",
            48 => "Flash write error",
            49 => "Flash write protect error",
            64 => "Invalid Parameter ID",
            65 => "Invalid Block ID",
            66 => "Parameter Limit error",
            67 => "Parameter table not initialized",
            80 => "Power-on Error",
            _ => return None,
        };
        Some(text)
    }
}

impl From<u8> for DeviceStatus {
    fn from(code: u8) -> Self {
        DeviceStatus(code)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{text} ({})", self.0),
            None => write!(f, "unknown error ({})", self.0),
        }
    }
}
