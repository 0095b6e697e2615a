use std::net::{TcpStream, ToSocketAddrs};

use lnet_transport::{StreamTransport, Transport};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Open a session on `transport` and run the handshake with default
/// configuration.
pub fn connect<T: Transport>(transport: T) -> Result<Session<T>> {
    connect_with_config(transport, SessionConfig::default())
}

/// Open a session with explicit configuration.
///
/// With [`SessionConfig::handshake`] set, Device Info is fetched (and
/// cached) before returning; a failure there fails the connect. The scope
/// status is read next, but only logged if it fails since not every
/// firmware ships the scope.
pub fn connect_with_config<T: Transport>(transport: T, config: SessionConfig) -> Result<Session<T>> {
    let session = Session::with_config(transport, config);
    if session.config().handshake {
        handshake(&session)?;
    }
    Ok(session)
}

/// Connect to a device bridged over TCP.
pub fn connect_tcp(
    addr: impl ToSocketAddrs,
    config: SessionConfig,
) -> Result<Session<StreamTransport<TcpStream>>> {
    let transport = StreamTransport::connect_tcp(addr)?;
    connect_with_config(transport, config)
}

fn handshake<T: Transport>(session: &Session<T>) -> Result<()> {
    let info = session.refresh_device_info()?;
    match info.processor() {
        Some(processor) => info!(
            processor = processor.name,
            width = processor.width.bytes(),
            state = %info.dsp_state,
            "handshake complete"
        ),
        None => warn!(
            processor_id = info.processor_id,
            "handshake complete, unknown processor"
        ),
    }

    match session.load_parameter() {
        Ok(scope) => debug!(
            channels = scope.channel_count,
            ready = scope.is_data_ready(),
            "scope status"
        ),
        Err(err) => warn!(error = %err, "could not read scope status during handshake"),
    }
    Ok(())
}
