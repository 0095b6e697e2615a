use std::time::Duration;

use lnet_service::AddressWidth;

/// Session behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Node addressed by the convenience methods.
    pub node: u8,
    /// Reply timeout for the convenience methods.
    pub timeout: Duration,
    /// Quiet period used to flush stray input after a timeout.
    pub drain_timeout: Duration,
    /// How long to wait for an (optional) reboot acknowledgement.
    pub reboot_grace: Duration,
    /// Ignore replies from other nodes instead of accepting any node.
    pub match_node: bool,
    /// Target address width. Taken from Device Info when `None`.
    pub address_width: Option<AddressWidth>,
    /// Run the Device Info / Load Parameter handshake on connect.
    pub handshake: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            node: 1,
            timeout: Duration::from_secs(1),
            drain_timeout: Duration::from_millis(20),
            reboot_grace: Duration::from_millis(100),
            match_node: true,
            address_width: None,
            handshake: true,
        }
    }
}
