#![allow(dead_code)]

//! Simulated dsPIC monitor for integration tests.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use lnet::frame::{decode_frame, Frame, FrameKind};
use lnet::service::{DeviceInfo, DeviceStatus, DspState, ScopeData};
use lnet::transport::{Result as TransportResult, Transport, TransportError};

pub const PROCESSOR_ID: u16 = 0x8210;
pub const RAM_SIZE: usize = 0x1_0000;

/// Firmware-side state, shared with the test for inspection.
pub struct Firmware {
    pub ram: Vec<u8>,
    pub scope_channels: u8,
    pub reboots: usize,
    pub requests: Vec<Frame>,
    /// Garbage sent in front of the next reply.
    pub noise: Vec<u8>,
    /// Replies are held back this many times.
    pub mute: usize,
}

impl Default for Firmware {
    fn default() -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            scope_channels: 0,
            reboots: 0,
            requests: Vec::new(),
            noise: Vec::new(),
            mute: 0,
        }
    }
}

impl Firmware {
    pub fn device_info() -> DeviceInfo {
        DeviceInfo {
            monitor_version: 0x0500,
            app_version: 0x0001,
            max_target_size: 0xFF,
            processor_id: PROCESSOR_ID,
            monitor_date: "Mar042025".into(),
            monitor_time: "1200".into(),
            app_date: "Mar052025".into(),
            app_time: "0930".into(),
            dsp_state: DspState::ApplicationLoaded,
            event_type: 0,
            event_id: 0,
            table_struct_address: 0x1800,
        }
    }

    /// Run one request and return the encoded reply, if any.
    fn serve(&mut self, frame: Frame) -> Option<Vec<u8>> {
        let (status, payload) = match frame.service_id {
            0 => {
                let mut buf = BytesMut::new();
                Self::device_info().encode(&mut buf);
                (DeviceStatus::OK, buf.to_vec())
            }
            9 => {
                let p = &frame.payload;
                let address = usize::from(u16::from_le_bytes([p[0], p[1]]));
                let len = usize::from(p[2]);
                (DeviceStatus::OK, self.ram[address..address + len].to_vec())
            }
            10 => {
                let p = &frame.payload;
                let address = usize::from(u16::from_le_bytes([p[0], p[1]]));
                let len = usize::from(p[2]);
                self.ram[address..address + len].copy_from_slice(&p[3..3 + len]);
                (DeviceStatus::OK, Vec::new())
            }
            18 => {
                self.scope_channels = frame.payload.get(3).copied().unwrap_or(0);
                (DeviceStatus::OK, Vec::new())
            }
            19 => {
                let mut buf = BytesMut::new();
                ScopeData {
                    channel_count: self.scope_channels,
                    sample_time_factor: 1,
                    data_array_size: 0x0400,
                    scope_version: 1,
                    ..ScopeData::default()
                }
                .encode(&mut buf);
                (DeviceStatus::OK, buf.to_vec())
            }
            25 => {
                self.reboots += 1;
                self.requests.push(frame);
                return None;
            }
            _ => (DeviceStatus::SERVICE_NOT_AVAILABLE, Vec::new()),
        };

        let mut wire = std::mem::take(&mut self.noise);
        let mut buf = BytesMut::new();
        Frame::response(frame.node, frame.service_id, status.0, Bytes::from(payload))
            .encode(&mut buf)
            .expect("reply should encode");
        wire.extend_from_slice(&buf);
        self.requests.push(frame);

        if self.mute > 0 {
            self.mute -= 1;
            return None;
        }
        Some(wire)
    }
}

/// In-memory link to a [`Firmware`].
///
/// Replies come back a few bytes per read, the way a slow UART delivers.
pub struct SimLink {
    firmware: Arc<Mutex<Firmware>>,
    inbound: BytesMut,
    outbound: VecDeque<u8>,
    chunk: usize,
    closed: bool,
}

impl SimLink {
    pub fn new() -> (Self, Arc<Mutex<Firmware>>) {
        let firmware = Arc::new(Mutex::new(Firmware::default()));
        let link = Self {
            firmware: Arc::clone(&firmware),
            inbound: BytesMut::new(),
            outbound: VecDeque::new(),
            chunk: 5,
            closed: false,
        };
        (link, firmware)
    }
}

impl Transport for SimLink {
    fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.inbound.extend_from_slice(data);
        let mut firmware = self.firmware.lock().expect("firmware lock");
        while let Some(frame) = decode_frame(&mut self.inbound, FrameKind::Request)
            .expect("master should send well-formed frames")
        {
            if let Some(reply) = firmware.serve(frame) {
                self.outbound.extend(reply);
            }
        }
        Ok(())
    }

    fn read_available(&mut self, max_wait: Duration) -> TransportResult<Bytes> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.outbound.is_empty() {
            thread::sleep(max_wait);
            return Err(TransportError::Timeout(max_wait));
        }
        let take = self.chunk.min(self.outbound.len());
        Ok(self.outbound.drain(..take).collect::<Vec<_>>().into())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "sim"
    }
}

/// Serve one TCP client from a [`Firmware`] on a background thread.
pub fn spawn_tcp_firmware() -> (SocketAddr, Arc<Mutex<Firmware>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener address");
    let firmware = Arc::new(Mutex::new(Firmware::default()));
    let shared = Arc::clone(&firmware);

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("client should connect");
        let mut inbound = BytesMut::new();
        let mut buf = [0u8; 512];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            inbound.extend_from_slice(&buf[..n]);
            while let Ok(Some(frame)) = decode_frame(&mut inbound, FrameKind::Request) {
                let reply = shared.lock().expect("firmware lock").serve(frame);
                if let Some(reply) = reply {
                    if stream.write_all(&reply).is_err() {
                        return;
                    }
                }
            }
        }
    });

    (addr, firmware)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
