//! # Ultramat Frame Handling
//!
//! A charger status frame is a fixed-length run of ASCII characters enclosed in
//! a form-feed start sentinel and a carriage-return end sentinel:
//!
//! ```text
//! 0C | payload (ASCII hex fields) ... | c c c c | 0D
//!      ^ byte 1                         ^ len-5    ^ len-1
//! ```
//!
//! The four characters before the end sentinel carry the additive checksum of
//! every byte between the start sentinel and the checksum itself, rendered as
//! uppercase ASCII hex.
//!
//! ## Usage
//!
//! ```rust
//! use ultramat_rs::protocol::frame::{build_frame, is_valid};
//!
//! let frame = build_frame(b"A700");
//! assert_eq!(frame, b"\x0cA70000D8\x0d".to_vec());
//! assert!(is_valid(&frame));
//! ```

use crate::constants::{CHECKSUM_LEN, FRAME_BEGIN, FRAME_END};
use crate::error::{DecodeError, UltramatError};
use crate::util::hex::{ascii_hex_u16, parse_ascii_hex};
use bytes::Bytes;

/// Smallest byte sequence that can hold the sentinels and a checksum trailer.
pub const MIN_FRAME_LEN: usize = CHECKSUM_LEN + 2;

/// A status frame read from the device.
///
/// Frames handed out by the reader have already passed sentinel and checksum
/// validation; the content is immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Validates sentinels and checksum and wraps the bytes.
    pub fn parse(data: impl Into<Bytes>) -> Result<Frame, UltramatError> {
        let data = data.into();
        check_sentinels(&data)?;
        verify_checksum(&data)?;
        Ok(Frame { data })
    }

    /// Wraps bytes without validation.
    pub fn from_unchecked(data: impl Into<Bytes>) -> Frame {
        Frame { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn field(&self, offset: usize, len: usize) -> Result<&[u8], DecodeError> {
        field(&self.data, offset, len)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Bounds-checked field slice.
pub fn field(data: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    data.get(offset..offset + len).ok_or(DecodeError::OutOfBounds {
        offset,
        len: data.len(),
    })
}

/// Parses an ASCII-hex field at `offset`.
pub fn hex_field(data: &[u8], offset: usize, len: usize) -> Result<u16, DecodeError> {
    let raw = field(data, offset, len)?;
    parse_ascii_hex(raw).map_err(|_| DecodeError::InvalidHex {
        offset,
        text: String::from_utf8_lossy(raw).into_owned(),
    })
}

/// Unsigned additive sum of all bytes, wrapping at 16 bits.
pub fn additive_sum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Renders the checksum trailer for a payload.
pub fn encode_checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    ascii_hex_u16(additive_sum(payload))
}

/// Checks the additive checksum of a status frame.
///
/// The sum runs over `frame[1 .. len-5]` and is compared against the hex value
/// of `frame[len-5 .. len-1]`. Frames too short to hold a trailer, or whose
/// trailer is not hex, are invalid.
pub fn is_valid(frame: &[u8]) -> bool {
    verify_checksum(frame).is_ok()
}

/// Like [`is_valid`] but reports expected and calculated sums on mismatch.
pub fn verify_checksum(frame: &[u8]) -> Result<(), UltramatError> {
    verify_trailer(frame, 1)
}

/// Checksum check for configuration answers, which carry a trailing ACK after
/// the end sentinel.
pub fn verify_answer_checksum(answer: &[u8]) -> Result<(), UltramatError> {
    verify_trailer(answer, 2)
}

fn verify_trailer(data: &[u8], tail: usize) -> Result<(), UltramatError> {
    if data.len() < MIN_FRAME_LEN + tail - 1 {
        return Err(UltramatError::Framing(format!(
            "{} bytes cannot hold a checksum trailer",
            data.len()
        )));
    }
    let trailer_start = data.len() - tail - CHECKSUM_LEN;
    let trailer = &data[trailer_start..trailer_start + CHECKSUM_LEN];
    let expected = parse_ascii_hex(trailer).map_err(|_| {
        UltramatError::Framing(format!(
            "checksum trailer {:?} is not hex",
            String::from_utf8_lossy(trailer)
        ))
    })?;
    let calculated = additive_sum(&data[1..trailer_start]);
    if expected != calculated {
        return Err(UltramatError::Checksum {
            expected,
            calculated,
        });
    }
    Ok(())
}

/// Checks start and end sentinel of a status frame.
pub fn check_sentinels(data: &[u8]) -> Result<(), UltramatError> {
    match (data.first(), data.last()) {
        (Some(&FRAME_BEGIN), Some(&FRAME_END)) => Ok(()),
        (Some(&FRAME_BEGIN), last) => Err(UltramatError::Framing(format!(
            "missing end sentinel, last byte {last:02X?}"
        ))),
        (first, _) => Err(UltramatError::Framing(format!(
            "missing start sentinel, first byte {first:02X?}"
        ))),
    }
}

/// Encloses a payload in sentinels and appends its checksum trailer.
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + MIN_FRAME_LEN);
    frame.push(FRAME_BEGIN);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&encode_checksum(payload));
    frame.push(FRAME_END);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_of_reset_commands() {
        assert_eq!(&encode_checksum(b"A700"), b"00D8");
        assert_eq!(&encode_checksum(b"C000"), b"00D3");
    }

    #[test]
    fn test_build_and_validate() {
        let frame = build_frame(b"0102030405");
        assert_eq!(frame[0], FRAME_BEGIN);
        assert_eq!(*frame.last().unwrap(), FRAME_END);
        assert!(is_valid(&frame));
        assert!(Frame::parse(frame).is_ok());
    }

    #[test]
    fn test_checksum_mismatch_reports_sums() {
        let mut frame = build_frame(b"0000");
        frame[1] = b'1';
        match verify_checksum(&frame) {
            Err(UltramatError::Checksum {
                expected,
                calculated,
            }) => {
                assert_eq!(expected, 0xC0);
                assert_eq!(calculated, 0xC1);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_short_and_non_hex_trailers() {
        assert!(!is_valid(&[0x0C, 0x0D]));
        assert!(!is_valid(b"\x0c00zz00\x0d"));
    }

    #[test]
    fn test_sentinel_errors() {
        assert!(matches!(
            check_sentinels(b"x0000\x0d"),
            Err(UltramatError::Framing(_))
        ));
        assert!(matches!(
            check_sentinels(b"\x0c0000x"),
            Err(UltramatError::Framing(_))
        ));
        assert!(check_sentinels(b"\x0c\x0d").is_ok());
    }

    #[test]
    fn test_field_bounds() {
        let frame = Frame::from_unchecked(build_frame(b"0BB8"));
        assert_eq!(frame.field(1, 4).unwrap(), b"0BB8");
        assert_eq!(hex_field(frame.as_bytes(), 1, 4).unwrap(), 3000);
        assert_eq!(
            frame.field(8, 4),
            Err(DecodeError::OutOfBounds { offset: 8, len: 10 })
        );
    }
}
