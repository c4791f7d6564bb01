//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to test the
//! charger protocol without requiring actual hardware. Reads on an empty
//! receive buffer stay pending until more data is queued, so read deadlines
//! behave like on a silent line (and advance instantly under a paused tokio
//! clock).

use crate::constants::{ACK, FRAME_BEGIN, FRAME_END, NAK};
use crate::protocol::frame::{build_frame, encode_checksum};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Mock serial port that simulates bidirectional communication
#[derive(Clone)]
pub struct MockSerialPort {
    /// Data written to the port (outgoing)
    pub tx_buffer: Arc<Mutex<Vec<u8>>>,
    /// Data to be read from the port (incoming)
    pub rx_buffer: Arc<Mutex<VecDeque<u8>>>,
    /// Simulated errors
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    /// Reader parked on an empty receive buffer
    rx_waker: Arc<Mutex<Option<Waker>>>,
    /// Once set, an empty receive buffer reports end of stream
    rx_closed: Arc<Mutex<bool>>,
}

/// Canned device responses.
pub enum Response {
    Ack,
    Nak,
    /// Status frame built from a payload (sentinels and checksum added)
    Frame(Vec<u8>),
    /// Configuration answer built from a payload (`0C data ck 0D 06`)
    Answer(Vec<u8>),
    /// Raw bytes, e.g. line noise
    Raw(Vec<u8>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerialPort {
    pub fn new() -> Self {
        MockSerialPort {
            tx_buffer: Arc::new(Mutex::new(Vec::new())),
            rx_buffer: Arc::new(Mutex::new(VecDeque::new())),
            next_error: Arc::new(Mutex::new(None)),
            rx_waker: Arc::new(Mutex::new(None)),
            rx_closed: Arc::new(Mutex::new(false)),
        }
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        lock(&self.rx_buffer).extend(data);
        self.wake_reader();
    }

    /// Queue a canned device response
    pub fn queue_response(&self, response: Response) {
        let bytes = match response {
            Response::Ack => vec![ACK],
            Response::Nak => vec![NAK],
            Response::Frame(payload) => build_frame(&payload),
            Response::Answer(payload) => {
                let mut answer = Vec::with_capacity(payload.len() + 7);
                answer.push(FRAME_BEGIN);
                answer.extend_from_slice(&payload);
                answer.extend_from_slice(&encode_checksum(&payload));
                answer.push(FRAME_END);
                answer.push(ACK);
                answer
            }
            Response::Raw(bytes) => bytes,
        };
        self.queue_rx_data(&bytes);
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        lock(&self.tx_buffer).clone()
    }

    /// Number of bytes still waiting to be read
    pub fn pending_rx(&self) -> usize {
        lock(&self.rx_buffer).len()
    }

    /// Clear all buffers
    pub fn clear(&self) {
        lock(&self.tx_buffer).clear();
        lock(&self.rx_buffer).clear();
    }

    /// Set an error to be returned on the next operation
    pub fn set_next_error(&self, error: io::Error) {
        *lock(&self.next_error) = Some(error);
        self.wake_reader();
    }

    /// Simulate the device going away: reads on an empty buffer hit end of stream
    pub fn close_rx(&self) {
        *lock(&self.rx_closed) = true;
        self.wake_reader();
    }

    fn wake_reader(&self) {
        if let Some(waker) = lock(&self.rx_waker).take() {
            waker.wake();
        }
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(error) = lock(&self.next_error).take() {
            return Poll::Ready(Err(error));
        }

        let mut rx = lock(&self.rx_buffer);
        let available = rx.len().min(buf.remaining());

        if available > 0 {
            let data: Vec<u8> = rx.drain(..available).collect();
            buf.put_slice(&data);
            return Poll::Ready(Ok(()));
        }

        if *lock(&self.rx_closed) {
            return Poll::Ready(Ok(()));
        }

        *lock(&self.rx_waker) = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(error) = lock(&self.next_error).take() {
            return Poll::Ready(Err(error));
        }

        lock(&self.tx_buffer).extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
