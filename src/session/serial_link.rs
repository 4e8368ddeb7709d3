//! Serial link to the board
//! 设计
//! - 端口由会话独占，握手失败或断开时关闭
//! - 读端通过 ReaderLease 借出，lease 被 drop 时释放，且每次借出只释放一次

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_serial::SerialPortBuilderExt;

use super::traits::PortOpener;
use crate::common::error::ClientError;
use crate::{debug, info, warn};

const LOG_TAG: &str = "serial_link.rs | serial link";

/// anything that behaves like an open serial port
pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> SerialIo for T {}

pub struct SerialLink {
    port_name: String,
    io: Box<dyn SerialIo>,
    // number of reader leases given back so far
    releases: Arc<AtomicUsize>,
}

impl SerialLink {
    pub fn new(port_name: &str, io: Box<dyn SerialIo>) -> Self {
        SerialLink {
            port_name: port_name.to_string(),
            io,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }

    /// borrow the read side, released when the lease is dropped
    pub fn lock_reader(&mut self) -> ReaderLease<'_> {
        debug!(LOG_TAG, "reader locked, port: {}", self.port_name);
        ReaderLease { link: self }
    }

    /// flush and close the port
    pub async fn close(mut self) {
        if let Err(e) = self.io.shutdown().await {
            warn!(LOG_TAG, "error while closing port {}: {}", self.port_name, e);
        }
        info!(LOG_TAG, "serial port {} closed", self.port_name);
    }
}

pub struct ReaderLease<'a> {
    link: &'a mut SerialLink,
}

impl AsyncRead for ReaderLease<'_> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.link.io).poll_read(cx, buf)
    }
}

impl Drop for ReaderLease<'_> {
    fn drop(&mut self) {
        self.link.releases.fetch_add(1, Ordering::SeqCst);
        debug!(LOG_TAG, "reader released, port: {}", self.link.port_name);
    }
}

/// opens real ports through tokio-serial
pub struct NativePortOpener;

impl PortOpener for NativePortOpener {
    fn open(&self, port_name: &str, baud_rate: u32) -> Result<SerialLink, ClientError> {
        let port = tokio_serial::new(port_name, baud_rate).open_native_async()?;
        info!(LOG_TAG, "serial port {} opened at {} baud", port_name, baud_rate);
        Ok(SerialLink::new(port_name, Box::new(port)))
    }
}

/// names of the serial ports attached to this machine
pub fn list_ports() -> Result<Vec<String>, ClientError> {
    let ports = tokio_serial::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_lease_released_once() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut link = SerialLink::new("/dev/ttyTEST0", Box::new(host));
        let counter = link.release_counter();

        device.write_all(b"hi").await.unwrap();
        {
            let mut lease = link.lock_reader();
            let mut buf = [0u8; 2];
            lease.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"hi");
            assert_eq!(counter.load(Ordering::SeqCst), 0);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(link.port_name(), "/dev/ttyTEST0");
        link.close().await;
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let res = NativePortOpener.open("/dev/does-not-exist-rainshelter", 9600);
        assert!(res.is_err());
    }
}
