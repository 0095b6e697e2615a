//! Tokio front end for [`Session`].
//!
//! Each exchange runs on the blocking thread pool, so async callers never
//! stall the runtime while the transport waits. Ordering and the
//! one-request-in-flight rule come from the wrapped session.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use lnet_service::{DeviceInfo, Request, Response, ScopeData, ScopeSetup, ServiceReply};
use lnet_transport::Transport;

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Cloneable async handle to a shared [`Session`].
pub struct AsyncSession<T: Transport> {
    inner: Arc<Session<T>>,
}

impl<T: Transport> Clone for AsyncSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> AsyncSession<T> {
    pub fn new(session: Session<T>) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }

    /// The blocking session behind this handle.
    pub fn session(&self) -> &Arc<Session<T>> {
        &self.inner
    }

    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Session<T>) -> Result<R> + Send + 'static,
    {
        let session = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&*session))
            .await
            .map_err(|_| SessionError::Cancelled)?
    }

    pub async fn request(
        &self,
        node: u8,
        service_id: u8,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<Response> {
        let payload = payload.into();
        self.run(move |s| s.request(node, service_id, &payload, timeout))
            .await
    }

    pub async fn call(&self, node: u8, request: Request, timeout: Duration) -> Result<ServiceReply> {
        self.run(move |s| s.call(node, &request, timeout)).await
    }

    pub async fn device_info(&self) -> Result<DeviceInfo> {
        self.run(|s| s.device_info()).await
    }

    pub async fn get_ram(&self, address: u32, length: u8) -> Result<Bytes> {
        self.run(move |s| s.get_ram(address, length)).await
    }

    pub async fn get_ram_block(&self, address: u32, length: usize) -> Result<Bytes> {
        self.run(move |s| s.get_ram_block(address, length)).await
    }

    pub async fn put_ram(&self, address: u32, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        self.run(move |s| s.put_ram(address, &data)).await
    }

    pub async fn save_parameter(&self, setup: ScopeSetup) -> Result<Bytes> {
        self.run(move |s| s.save_parameter(&setup)).await
    }

    pub async fn load_parameter(&self) -> Result<ScopeData> {
        self.run(|s| s.load_parameter()).await
    }

    pub async fn reboot(&self) -> Result<()> {
        self.run(|s| s.reboot()).await
    }

    pub async fn close(&self) -> Result<()> {
        self.run(|s| s.close()).await
    }
}

impl<T: Transport + 'static> From<Session<T>> for AsyncSession<T> {
    fn from(session: Session<T>) -> Self {
        Self::new(session)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use lnet_service::AddressWidth;

    use super::*;
    use crate::config::SessionConfig;
    use crate::session::tests::{firmware, FakeDevice};

    fn session() -> (AsyncSession<FakeDevice>, std::sync::Arc<crate::session::tests::Recorder>) {
        let (device, recorder) = FakeDevice::new(firmware);
        let session = Session::with_config(
            device,
            SessionConfig {
                timeout: Duration::from_millis(200),
                drain_timeout: Duration::from_millis(5),
                reboot_grace: Duration::from_millis(20),
                address_width: Some(AddressWidth::Bits32),
                ..SessionConfig::default()
            },
        );
        (AsyncSession::new(session), recorder)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_get_their_own_replies() {
        let (session, recorder) = session();

        let mut tasks = Vec::new();
        for i in 0..16u32 {
            let session = session.clone();
            tasks.push(tokio::spawn(async move {
                let address = 0x4000 + i * 0x10;
                let data = session.get_ram(address, 2).await.unwrap();
                assert_eq!(data.as_ref(), &[address as u8, address as u8 + 1]);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(!recorder.overlapping.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn typed_calls_and_close() {
        let (session, recorder) = session();

        let info = session.device_info().await.unwrap();
        assert_eq!(info.processor_id, 0x8220);
        session.put_ram(0x10, vec![1u8, 2]).await.unwrap();
        assert!(session.load_parameter().await.unwrap().is_data_ready());
        session.reboot().await.unwrap();

        session.close().await.unwrap();
        assert!(recorder.closed.load(Ordering::SeqCst));
        assert!(matches!(
            session.call(1, Request::DeviceInfo, Duration::from_millis(10)).await,
            Err(SessionError::Closed)
        ));
    }
}
