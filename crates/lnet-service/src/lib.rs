//! LNet services.
//!
//! Every LNet operation is a service multiplexed over the same frame by a
//! numeric id. This crate builds request payloads and decodes reply
//! payloads; it never touches a transport.
//!
//! | Service | Id |
//! |---|---|
//! | Device Info | 0 |
//! | Get RAM | 9 |
//! | Put RAM | 10 |
//! | Save Parameter | 18 |
//! | Load Parameter | 19 |
//! | Reboot | 25 |

pub mod device_info;
pub mod error;
pub mod id;
pub mod reply;
pub mod request;
pub mod scope;
pub mod status;
pub mod target;

pub use device_info::{DeviceInfo, DspState};
pub use error::{Result, ServiceError};
pub use id::ServiceId;
pub use reply::{Response, ServiceReply};
pub use request::{
    GetRamRequest, PutRamRequest, Request, MAX_REPLY_PAYLOAD, MAX_REQUEST_PAYLOAD,
};
pub use scope::{
    ScopeChannel, ScopeData, ScopeMode, ScopeSetup, ScopeTrigger, TriggerEdge, MAX_CHANNELS,
    SCOPE_PARAMETER_ID,
};
pub use status::DeviceStatus;
pub use target::{AddressWidth, Processor};
