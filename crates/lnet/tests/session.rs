mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{init_tracing, spawn_tcp_firmware, Firmware, SimLink, PROCESSOR_ID};
use lnet::service::{
    AddressWidth, DeviceStatus, Request, ScopeChannel, ScopeSetup, ScopeTrigger, ServiceId,
    ServiceReply,
};
use lnet::{connect_tcp, connect_with_config, Session, SessionConfig, SessionError};

fn config() -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_millis(250),
        drain_timeout: Duration::from_millis(5),
        reboot_grace: Duration::from_millis(20),
        ..SessionConfig::default()
    }
}

fn open() -> (Session<SimLink>, Arc<std::sync::Mutex<Firmware>>) {
    init_tracing();
    let (link, firmware) = SimLink::new();
    let session = connect_with_config(link, config()).expect("handshake should succeed");
    (session, firmware)
}

#[test]
fn handshake_learns_target() {
    let (session, firmware) = open();

    let info = session.cached_device_info().expect("device info cached");
    assert_eq!(info, Firmware::device_info());
    assert_eq!(info.processor().map(|p| p.id), Some(PROCESSOR_ID));
    assert_eq!(session.address_width().unwrap(), AddressWidth::Bits16);

    let services: Vec<u8> = firmware
        .lock()
        .unwrap()
        .requests
        .iter()
        .map(|f| f.service_id)
        .collect();
    assert_eq!(services, vec![0, 19]);
}

#[test]
fn ram_write_then_read_back() {
    let (session, firmware) = open();

    // Reserved wire values in the payload have to survive stuffing.
    let data = [0x55, 0x02, 0x00, 0xAA, 0x55];
    session.put_ram(0x0820, &data).unwrap();
    assert_eq!(&firmware.lock().unwrap().ram[0x0820..0x0825], &data);

    let read = session.get_ram(0x0820, 5).unwrap();
    assert_eq!(read.as_ref(), &data);
}

#[test]
fn large_reads_are_split_into_frames() {
    let (session, firmware) = open();
    {
        let mut fw = firmware.lock().unwrap();
        for (i, byte) in fw.ram[0x2000..0x2000 + 600].iter_mut().enumerate() {
            *byte = i as u8;
        }
        fw.requests.clear();
    }

    let block = session.get_ram_block(0x2000, 600).unwrap();
    assert_eq!(block.len(), 600);
    assert!(block.iter().enumerate().all(|(i, b)| *b == i as u8));

    let lengths: Vec<u8> = firmware
        .lock()
        .unwrap()
        .requests
        .iter()
        .map(|f| f.payload[2])
        .collect();
    assert_eq!(lengths, vec![253, 253, 94]);
}

#[test]
fn unsupported_service_reports_device_status() {
    let (session, _firmware) = open();

    let err = session
        .request(1, 77, &[], Duration::from_millis(100))
        .unwrap_err();
    match err {
        SessionError::Device { service, status } => {
            assert_eq!(service, ServiceId::Unknown(77));
            assert_eq!(status, DeviceStatus::SERVICE_NOT_AVAILABLE);
        }
        other => panic!("expected device error, got {other:?}"),
    }

    // The session keeps working.
    assert!(session.get_ram(0x0100, 2).is_ok());
}

#[test]
fn noise_before_reply_is_skipped() {
    let (session, firmware) = open();
    firmware.lock().unwrap().ram[0x40] = 0x5A;
    firmware.lock().unwrap().noise = vec![0x13, 0x37, 0xFF, 0x02, 0x00];

    assert_eq!(session.get_ram(0x40, 1).unwrap().as_ref(), &[0x5A]);
}

#[test]
fn missing_reply_times_out_then_recovers() {
    let (session, firmware) = open();
    firmware.lock().unwrap().mute = 1;

    let start = Instant::now();
    let err = session.get_ram(0x10, 2).unwrap_err();
    let elapsed = start.elapsed();
    assert!(err.is_timeout());
    // Configured timeout is 250 ms, the drain window 5 ms.
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_millis(600), "took {elapsed:?}");

    firmware.lock().unwrap().ram[0x10] = 9;
    assert_eq!(session.get_ram(0x10, 1).unwrap().as_ref(), &[9]);
}

#[test]
fn scope_setup_is_saved_and_reported() {
    let (session, firmware) = open();

    let mut setup = ScopeSetup::new();
    setup
        .add_channel(ScopeChannel::new("speed", 0x1000, 2))
        .unwrap();
    setup
        .add_channel(ScopeChannel::new("current", 0x1002, 2))
        .unwrap();
    setup
        .add_channel(ScopeChannel::new("angle", 0x1004, 4))
        .unwrap();
    setup.set_trigger(ScopeTrigger::new("speed", 500)).unwrap();

    session.save_parameter(&setup).unwrap();
    assert_eq!(firmware.lock().unwrap().scope_channels, 3);

    let status = session.load_parameter().unwrap();
    assert_eq!(status.channel_count, 3);
    assert!(status.is_data_ready());

    let json = setup.to_json().unwrap();
    assert_eq!(ScopeSetup::from_json(&json).unwrap(), setup);
}

#[test]
fn typed_call_returns_service_reply() {
    let (session, firmware) = open();
    firmware.lock().unwrap().ram[0x30..0x32].copy_from_slice(&[1, 2]);

    let reply = session
        .call(1, &Request::get_ram(0x30, 2), Duration::from_millis(100))
        .unwrap();
    assert_eq!(reply, ServiceReply::GetRam(vec![1u8, 2].into()));
}

#[test]
fn reboot_succeeds_without_reply_and_forgets_target() {
    let (session, firmware) = open();

    session.reboot().unwrap();
    assert_eq!(firmware.lock().unwrap().reboots, 1);
    assert!(session.cached_device_info().is_none());

    // The width is learned again on the next RAM access.
    session.get_ram(0, 1).unwrap();
    assert!(session.cached_device_info().is_some());
}

#[test]
fn threads_share_one_session() {
    let (session, firmware) = open();
    {
        let mut fw = firmware.lock().unwrap();
        for (i, byte) in fw.ram[..0x800].iter_mut().enumerate() {
            *byte = (i / 0x100) as u8;
        }
    }
    let session = Arc::new(session);

    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for _ in 0..20 {
                    let data = session.get_ram(worker * 0x100, 16).unwrap();
                    assert!(data.iter().all(|b| u32::from(*b) == worker));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }
}

#[test]
fn closed_session_rejects_requests() {
    let (session, _firmware) = open();
    session.close().unwrap();
    assert!(session.is_closed());
    assert!(matches!(
        session.get_ram(0, 1),
        Err(SessionError::Closed)
    ));
}

#[test]
fn tcp_bridge_end_to_end() {
    init_tracing();
    let (addr, firmware) = spawn_tcp_firmware();

    let session = connect_tcp(addr, config()).expect("tcp connect should succeed");
    session.put_ram(0x0400, &[0xDE, 0xAD]).unwrap();
    assert_eq!(
        session.get_ram(0x0400, 2).unwrap().as_ref(),
        &[0xDE, 0xAD]
    );
    assert_eq!(&firmware.lock().unwrap().ram[0x0400..0x0402], &[0xDE, 0xAD]);
}
