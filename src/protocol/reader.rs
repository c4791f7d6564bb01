//! # Frame Reader
//!
//! Reads fixed-length frames from a [`Transport`], recovering from a stream
//! that was joined mid-frame. When the start sentinel is not at position 0
//! the buffer is scanned for it, the tail is shifted to the front and the
//! missing bytes are read with a shorter deadline. Framing and checksum
//! failures are counted and retried up to a fixed bound.

use crate::constants::{ACK, FRAME_BEGIN, FRAME_READ_TIMEOUT, MAX_SYNC_RETRIES, RESYNC_READ_TIMEOUT};
use crate::error::UltramatError;
use crate::protocol::frame::{check_sentinels, verify_answer_checksum, verify_checksum, Frame};
use crate::protocol::serial::Transport;
use crate::util::hex::{encode_hex, pretty_hex};
use bytes::{Bytes, BytesMut};
use std::time::Duration;

/// Shape of the expected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// `0C payload ck4 0D`
    Status,
    /// `0C payload ck4 0D 06`, the answer to a configuration read
    Answer,
}

impl FrameKind {
    fn validate(self, data: &[u8]) -> Result<(), UltramatError> {
        match self {
            FrameKind::Status => {
                check_sentinels(data)?;
                verify_checksum(data)
            }
            FrameKind::Answer => {
                if data.first() != Some(&FRAME_BEGIN) {
                    return Err(UltramatError::Framing(
                        "answer does not start with the start sentinel".into(),
                    ));
                }
                if data.last() != Some(&ACK) {
                    return Err(UltramatError::Framing("answer is not acknowledged".into()));
                }
                verify_answer_checksum(data)
            }
        }
    }
}

/// Stateful frame reader with resynchronization and bounded retry.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    in_sync: bool,
    transfer_errors: u64,
    max_sync_retries: u32,
    frame_timeout: Duration,
    resync_timeout: Duration,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(MAX_SYNC_RETRIES, FRAME_READ_TIMEOUT, RESYNC_READ_TIMEOUT)
    }
}

impl FrameReader {
    pub fn new(max_sync_retries: u32, frame_timeout: Duration, resync_timeout: Duration) -> Self {
        FrameReader {
            buf: BytesMut::new(),
            in_sync: false,
            transfer_errors: 0,
            max_sync_retries: max_sync_retries.max(1),
            frame_timeout,
            resync_timeout,
        }
    }

    /// Framing and checksum failures seen since creation.
    pub fn transfer_errors(&self) -> u64 {
        self.transfer_errors
    }

    /// True after the last candidate started on the start sentinel.
    pub fn is_in_sync(&self) -> bool {
        self.in_sync
    }

    /// Reads one validated status frame of `expected_len` bytes.
    ///
    /// Timeouts and transport errors are returned unchanged. After
    /// `max_sync_retries` consecutive invalid candidates the read fails with
    /// [`UltramatError::RetriesExhausted`].
    pub async fn read_frame<T>(
        &mut self,
        transport: &mut T,
        expected_len: usize,
    ) -> Result<Frame, UltramatError>
    where
        T: Transport + ?Sized,
    {
        let data = self
            .read_validated(transport, expected_len, FrameKind::Status, self.max_sync_retries)
            .await?;
        Ok(Frame::from_unchecked(data))
    }

    /// Reads one configuration answer of `expected_len` bytes.
    ///
    /// The device sends an answer only once per command, so an invalid answer
    /// is counted and returned as is; the caller resends the command.
    pub async fn read_answer<T>(
        &mut self,
        transport: &mut T,
        expected_len: usize,
    ) -> Result<Bytes, UltramatError>
    where
        T: Transport + ?Sized,
    {
        self.read_validated(transport, expected_len, FrameKind::Answer, 1)
            .await
            .map_err(|err| match err {
                UltramatError::RetriesExhausted { reason, .. } => UltramatError::Framing(reason),
                other => other,
            })
    }

    pub fn max_sync_retries(&self) -> u32 {
        self.max_sync_retries
    }

    async fn read_validated<T>(
        &mut self,
        transport: &mut T,
        expected_len: usize,
        kind: FrameKind,
        max_attempts: u32,
    ) -> Result<Bytes, UltramatError>
    where
        T: Transport + ?Sized,
    {
        if expected_len < 2 {
            return Err(UltramatError::Framing(format!(
                "frame length {expected_len} is too short"
            )));
        }

        let mut attempts = 0u32;
        loop {
            self.read_candidate(transport, expected_len).await?;
            match kind.validate(&self.buf) {
                Ok(()) => return Ok(Bytes::copy_from_slice(&self.buf)),
                Err(err) => {
                    attempts += 1;
                    self.transfer_errors += 1;
                    self.in_sync = false;
                    log::warn!(
                        "Transfer error {} (attempt {attempts}/{max_attempts}): {err}",
                        self.transfer_errors
                    );
                    if log::log_enabled!(log::Level::Trace) {
                        log::trace!("Rejected frame:\n{}", pretty_hex(&self.buf, 16));
                    }
                    if attempts >= max_attempts {
                        return Err(UltramatError::RetriesExhausted {
                            attempts,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Fills the buffer with one candidate frame, realigning on the start
    /// sentinel when the stream was joined mid-frame.
    async fn read_candidate<T>(
        &mut self,
        transport: &mut T,
        expected_len: usize,
    ) -> Result<(), UltramatError>
    where
        T: Transport + ?Sized,
    {
        self.buf.clear();
        self.buf.resize(expected_len, 0);
        transport.read(&mut self.buf[..], self.frame_timeout).await?;

        if self.buf[0] == FRAME_BEGIN {
            self.in_sync = true;
            return Ok(());
        }

        self.in_sync = false;
        if let Some(pos) = self.buf[1..].iter().position(|&b| b == FRAME_BEGIN) {
            let shift = pos + 1;
            if log::log_enabled!(log::Level::Debug) {
                log::debug!("Discarding {}", encode_hex(&self.buf[..shift]));
            }
            self.buf.copy_within(shift.., 0);
            transport
                .read(&mut self.buf[expected_len - shift..], self.resync_timeout)
                .await?;
            self.in_sync = true;
            log::debug!("Resynchronized after discarding {shift} bytes");
        }
        Ok(())
    }
}
