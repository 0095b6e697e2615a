use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use lnet_frame::{FrameError, FramedTransport};
use lnet_service::{
    AddressWidth, DeviceInfo, DeviceStatus, Request, Response, ScopeData, ScopeSetup,
    ServiceError, ServiceId, ServiceReply, MAX_REPLY_PAYLOAD,
};
use lnet_transport::{Transport, TransportError};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::turnstile::Turnstile;

/// Master-side connection to an LNet bus.
///
/// A session owns its transport and runs one request/response exchange at
/// a time. It can be shared between threads (`&Session` is enough to issue
/// requests); concurrent callers are served in arrival order.
pub struct Session<T: Transport> {
    link: Turnstile<Option<FramedTransport<T>>>,
    config: SessionConfig,
    device_info: Mutex<Option<DeviceInfo>>,
}

impl<T: Transport> Session<T> {
    /// Take ownership of an open transport, with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Take ownership of an open transport with explicit configuration.
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        info!(
            transport = transport.name(),
            node = config.node,
            "session opened"
        );
        Self {
            link: Turnstile::new(Some(FramedTransport::new(transport))),
            config,
            device_info: Mutex::new(None),
        }
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Send one request and wait for its reply.
    ///
    /// Frames that fail to parse are skipped while time remains. With
    /// [`SessionConfig::match_node`] set, replies from other nodes are
    /// skipped too. A nonzero status comes back as
    /// [`SessionError::Device`].
    ///
    /// Reboot (service 25) is the one exception to "no reply is an error":
    /// the target resets and usually never answers, so a timeout or a
    /// dropped link after the request went out yields an empty success.
    pub fn request(
        &self,
        node: u8,
        service_id: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Response> {
        let mut turn = self.link.enter();
        let framed = turn.as_mut().ok_or(SessionError::Closed)?;
        let service = ServiceId::from(service_id);

        // One non-blocking read: a busy bus must not hold up the send.
        if let Err(err) = framed.discard_input(Duration::ZERO, Duration::ZERO) {
            debug!(error = %err, "could not flush input before request");
        }
        framed.send(node, service_id, payload)?;

        let outcome = self.await_reply(framed, node, service, timeout);
        match outcome {
            Err(SessionError::Timeout { .. }) | Err(SessionError::Transport(_))
                if service == ServiceId::Reboot =>
            {
                info!(node, "no reply to reboot request; target is restarting");
                Ok(Response {
                    node,
                    service,
                    status: DeviceStatus::OK,
                    payload: Bytes::new(),
                })
            }
            Err(err @ SessionError::Timeout { .. }) | Err(err @ SessionError::Service(_)) => {
                self.drain(framed);
                Err(err)
            }
            other => other,
        }
    }

    fn await_reply(
        &self,
        framed: &mut FramedTransport<T>,
        node: u8,
        service: ServiceId,
        timeout: Duration,
    ) -> Result<Response> {
        let deadline = Instant::now() + timeout;
        loop {
            let frame = match framed.recv_frame_until(deadline) {
                Ok(frame) => frame,
                Err(err) if err.is_corruption() => {
                    warn!(node, %service, error = %err, "dropping corrupt frame");
                    continue;
                }
                Err(FrameError::Transport(TransportError::Timeout(_))) => {
                    warn!(node, %service, ?timeout, "request timed out");
                    return Err(SessionError::Timeout {
                        node,
                        service,
                        timeout,
                    });
                }
                Err(err) => return Err(err.into()),
            };

            if self.config.match_node && frame.node != node {
                debug!(
                    expected = node,
                    found = frame.node,
                    "ignoring frame from another node"
                );
                continue;
            }

            // Unlike frames from other nodes, a wrong service from the
            // addressed node is not skipped: it ends the wait, even when it
            // is a late reply to an earlier request that missed the drain.
            let response = Response::from(frame);
            if response.service != service {
                return Err(ServiceError::UnexpectedService {
                    expected: service,
                    found: response.service,
                }
                .into());
            }
            if !response.is_success() {
                warn!(node, %service, status = %response.status, "device reported an error");
                return Err(SessionError::Device {
                    service,
                    status: response.status,
                });
            }
            return Ok(response);
        }
    }

    /// Flush late or stray bytes so they cannot be mistaken for the next reply.
    ///
    /// Bounded by `drain_timeout` in total, even if the link never goes quiet.
    fn drain(&self, framed: &mut FramedTransport<T>) {
        let window = self.config.drain_timeout;
        match framed.discard_input(window, window) {
            Ok(0) => {}
            Ok(dropped) => debug!(dropped, "drained stray input"),
            Err(err) => debug!(error = %err, "could not drain input"),
        }
    }

    /// Run a typed service request against `node`.
    pub fn call(&self, node: u8, request: &Request, timeout: Duration) -> Result<ServiceReply> {
        let width = if request.needs_address_width() {
            Some(self.address_width()?)
        } else {
            None
        };
        let payload = request.encode_payload(width)?;
        let service = request.service_id();
        let response = self.request(node, service.as_u8(), &payload, timeout)?;
        if service == ServiceId::Reboot {
            return Ok(ServiceReply::Reboot);
        }
        Ok(ServiceReply::decode(request, &response)?)
    }

    fn call_default(&self, request: &Request) -> Result<ServiceReply> {
        self.call(self.config.node, request, self.config.timeout)
    }

    /// Device Info of the configured node, fetched once and cached.
    pub fn device_info(&self) -> Result<DeviceInfo> {
        if let Some(info) = self.cached_device_info() {
            return Ok(info);
        }
        self.refresh_device_info()
    }

    /// Fetch Device Info again and replace the cached copy.
    pub fn refresh_device_info(&self) -> Result<DeviceInfo> {
        let info = match self.call_default(&Request::DeviceInfo)? {
            ServiceReply::DeviceInfo(info) => info,
            other => return Err(unexpected(ServiceId::DeviceInfo, &other)),
        };
        debug!(
            processor_id = info.processor_id,
            monitor_version = info.monitor_version,
            app_version = info.app_version,
            state = %info.dsp_state,
            "device info"
        );
        *self
            .device_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(info.clone());
        Ok(info)
    }

    /// Device Info from the last successful fetch, without touching the link.
    pub fn cached_device_info(&self) -> Option<DeviceInfo> {
        self.device_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Address width from the configuration, else from Device Info.
    pub fn address_width(&self) -> Result<AddressWidth> {
        if let Some(width) = self.config.address_width {
            return Ok(width);
        }
        Ok(self.device_info()?.address_width()?)
    }

    /// Read `length` bytes of target RAM.
    pub fn get_ram(&self, address: u32, length: u8) -> Result<Bytes> {
        match self.call_default(&Request::get_ram(address, length))? {
            ServiceReply::GetRam(bytes) => Ok(bytes),
            other => Err(unexpected(ServiceId::GetRam, &other)),
        }
    }

    /// Read a block of any size, split into as many Get RAM requests as needed.
    pub fn get_ram_block(&self, address: u32, length: usize) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(length);
        let mut next = address;
        while out.len() < length {
            let chunk = (length - out.len()).min(MAX_REPLY_PAYLOAD);
            // MAX_REPLY_PAYLOAD fits a byte.
            out.extend_from_slice(&self.get_ram(next, chunk as u8)?);
            if out.len() < length {
                next = u32::try_from(chunk)
                    .ok()
                    .and_then(|step| next.checked_add(step))
                    .ok_or_else(|| {
                        ServiceError::InvalidArgument(format!(
                            "block of {length} bytes at {address:#x} runs past the address space"
                        ))
                    })?;
            }
        }
        Ok(out.freeze())
    }

    /// Write `data` to target RAM.
    pub fn put_ram(&self, address: u32, data: &[u8]) -> Result<()> {
        match self.call_default(&Request::put_ram(address, Bytes::copy_from_slice(data)))? {
            ServiceReply::PutRam => Ok(()),
            other => Err(unexpected(ServiceId::PutRam, &other)),
        }
    }

    /// Store a scope configuration. Returns the raw acknowledgement bytes.
    pub fn save_parameter(&self, setup: &ScopeSetup) -> Result<Bytes> {
        match self.call_default(&Request::SaveParameter(setup.clone()))? {
            ServiceReply::SaveParameter(ack) => Ok(ack),
            other => Err(unexpected(ServiceId::SaveParameter, &other)),
        }
    }

    /// Read the scope sampler status.
    pub fn load_parameter(&self) -> Result<ScopeData> {
        match self.call_default(&Request::LoadParameter)? {
            ServiceReply::LoadParameter(data) => Ok(data),
            other => Err(unexpected(ServiceId::LoadParameter, &other)),
        }
    }

    /// Restart the target. Waits [`SessionConfig::reboot_grace`] for an
    /// acknowledgement that usually never comes.
    pub fn reboot(&self) -> Result<()> {
        self.call(self.config.node, &Request::Reboot, self.config.reboot_grace)?;
        *self
            .device_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    /// True once [`Session::close`] has run. Waits for the exchange in flight.
    pub fn is_closed(&self) -> bool {
        self.link.enter().is_none()
    }

    /// Close the transport once the exchange in flight (if any) is done.
    ///
    /// Later requests fail with [`SessionError::Closed`]. Closing twice is
    /// a no-op.
    pub fn close(&self) -> Result<()> {
        let mut turn = self.link.enter();
        match turn.take() {
            Some(mut framed) => {
                info!(transport = framed.get_ref().name(), "closing session");
                framed.close()?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if let Some(mut framed) = self.link.get_mut().take() {
            debug!(transport = framed.get_ref().name(), "closing session on drop");
            if let Err(err) = framed.close() {
                warn!(error = %err, "failed to close transport");
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn unexpected(expected: ServiceId, reply: &ServiceReply) -> SessionError {
    ServiceError::UnexpectedService {
        expected,
        found: reply.service_id(),
    }
    .into()
}
