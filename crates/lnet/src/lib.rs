//! Master-side LNet protocol engine.
//!
//! LNet is the request/response protocol spoken by the debug monitor in
//! microcontroller firmware. A host sends a framed request naming a
//! service, the target answers with a frame carrying a status byte and the
//! service payload.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte link abstraction and a stream adapter (TCP, UDS)
//! - [`frame`]: SYN framing, byte stuffing and checksum
//! - [`service`]: typed service requests and reply decoders
//! - [`session`]: serialized request/response over one link
//!
//! ```no_run
//! use lnet::{connect_tcp, SessionConfig};
//!
//! let session = connect_tcp("192.168.1.20:12666", SessionConfig::default())?;
//! let info = session.device_info()?;
//! println!("monitor {:#06x} on processor {:#06x}", info.monitor_version, info.processor_id);
//! let sample = session.get_ram(0x1000, 4)?;
//! println!("{:02x?}", sample.as_ref());
//! # Ok::<(), lnet::SessionError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use lnet_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lnet_frame::*;
}

/// Re-export service types.
pub mod service {
    pub use lnet_service::*;
}

/// Re-export session types.
pub mod session {
    pub use lnet_session::*;
}

#[cfg(feature = "async")]
pub use lnet_session::AsyncSession;
pub use lnet_session::{
    connect, connect_tcp, connect_with_config, Result, Session, SessionConfig, SessionError,
};
pub use lnet_transport::{StreamTransport, Transport};
