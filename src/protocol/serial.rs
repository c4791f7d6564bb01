//! # Ultramat Serial Transport
//!
//! The [`Transport`] trait is the seam between the protocol code and the
//! physical link. [`SerialTransport`] opens a real serial port through
//! `tokio-serial`; [`StreamTransport`] runs the same logic over any async byte
//! stream, which is how the mock port and in-memory duplex pipes are plugged in.

use crate::config::SerialConfig;
use crate::error::UltramatError;
use crate::logging::log_frame;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

/// Byte-level link to a charger.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Opens the link. Opening an open link is a no-op.
    async fn open(&mut self) -> Result<(), UltramatError>;

    /// Closes the link. Closing a closed link is a no-op.
    async fn close(&mut self) -> Result<(), UltramatError>;

    fn is_connected(&self) -> bool;

    /// Writes all bytes and flushes.
    async fn write(&mut self, data: &[u8]) -> Result<(), UltramatError>;

    /// Fills the whole buffer or fails with [`UltramatError::Timeout`] once
    /// `timeout` expires.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), UltramatError>;
}

/// Async byte streams usable as a charger link.
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPort for T {}

/// Transport over an already opened async stream.
pub struct StreamTransport<P: SerialPort> {
    port: P,
    connected: bool,
}

impl<P: SerialPort> StreamTransport<P> {
    /// Wraps a stream; the transport starts out connected.
    pub fn new(port: P) -> Self {
        StreamTransport {
            port,
            connected: true,
        }
    }

    pub fn get_ref(&self) -> &P {
        &self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

#[async_trait::async_trait]
impl<P: SerialPort> Transport for StreamTransport<P> {
    async fn open(&mut self) -> Result<(), UltramatError> {
        self.connected = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), UltramatError> {
        if self.connected {
            self.connected = false;
            self.port.shutdown().await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), UltramatError> {
        if !self.connected {
            return Err(UltramatError::NotConnected);
        }
        log_frame("TX", data);
        self.port.write_all(data).await?;
        self.port.flush().await?;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), UltramatError> {
        if !self.connected {
            return Err(UltramatError::NotConnected);
        }
        tokio::time::timeout(timeout, self.port.read_exact(buf))
            .await
            .map_err(|_| UltramatError::timeout(timeout))??;
        log_frame("RX", buf);
        Ok(())
    }
}

/// Transport over a named serial port, 8N1.
pub struct SerialTransport {
    port_name: String,
    config: SerialConfig,
    stream: Option<StreamTransport<tokio_serial::SerialStream>>,
}

impl SerialTransport {
    pub fn new(port_name: &str, config: SerialConfig) -> Self {
        SerialTransport {
            port_name: port_name.to_string(),
            config,
            stream: None,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn stream(&mut self) -> Result<&mut StreamTransport<tokio_serial::SerialStream>, UltramatError> {
        self.stream.as_mut().ok_or(UltramatError::NotConnected)
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<(), UltramatError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let port = tokio_serial::new(&self.port_name, self.config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(self.config.frame_timeout())
            .open_native_async()?;
        log::info!(
            "Opened {} at {} baud",
            self.port_name,
            self.config.baudrate
        );
        self.stream = Some(StreamTransport::new(port));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), UltramatError> {
        if let Some(mut stream) = self.stream.take() {
            stream.close().await?;
            log::info!("Closed {}", self.port_name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), UltramatError> {
        self.stream()?.write(data).await
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), UltramatError> {
        self.stream()?.read(buf, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::serial_mock::MockSerialPort;

    #[tokio::test]
    async fn test_write_reaches_port() {
        let port = MockSerialPort::new();
        let mut transport = StreamTransport::new(port.clone());
        transport.write(&[0x0C, 0x0D]).await.unwrap();
        assert_eq!(port.get_tx_data(), vec![0x0C, 0x0D]);
    }

    #[tokio::test]
    async fn test_read_fills_buffer() {
        let port = MockSerialPort::new();
        port.queue_rx_data(b"\x0c0000\x0d");
        let mut transport = StreamTransport::new(port);
        let mut buf = [0u8; 6];
        transport
            .read(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf, b"\x0c0000\x0d");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out() {
        let port = MockSerialPort::new();
        port.queue_rx_data(b"\x0c00");
        let mut transport = StreamTransport::new(port);
        let mut buf = [0u8; 6];
        let err = transport
            .read(&mut buf, Duration::from_millis(3000))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_io() {
        let mut transport = StreamTransport::new(MockSerialPort::new());
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(b"x").await,
            Err(UltramatError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_serial_transport_starts_closed() {
        let mut transport = SerialTransport::new("/dev/null-ultramat", SerialConfig::default());
        assert!(!transport.is_connected());
        let mut buf = [0u8; 1];
        assert!(matches!(
            transport.read(&mut buf, Duration::from_millis(1)).await,
            Err(UltramatError::NotConnected)
        ));
    }
}
