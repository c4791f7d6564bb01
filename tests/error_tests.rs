//! Tests for error classification and messages.

use std::time::Duration;
use ultramat_rs::{DecodeError, UltramatError};

#[test]
fn test_timeout_is_not_fatal() {
    let err = UltramatError::timeout(Duration::from_millis(1000));
    assert!(err.is_timeout());
    assert!(!err.is_recoverable());
    assert!(!err.is_fatal());
    assert_eq!(err.to_string(), "Timeout after 1000 ms waiting for device data");
}

#[test]
fn test_fatal_errors() {
    let errors = [
        UltramatError::SerialPortError("gone".into()),
        UltramatError::ProtocolMismatch {
            expected: "Ultra Duo Plus 60".into(),
            found: "Ultramat 18".into(),
        },
        UltramatError::RetriesExhausted {
            attempts: 10,
            reason: "bad checksum".into(),
        },
        UltramatError::NotConnected,
    ];
    for err in errors {
        assert!(err.is_fatal(), "{err}");
    }
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
    let err: UltramatError = io.into();
    assert!(matches!(err, UltramatError::SerialPortError(_)));
}

#[test]
fn test_decode_error_messages() {
    let err = DecodeError::InvalidHex {
        offset: 21,
        text: "0BG8".into(),
    };
    assert_eq!(err.to_string(), "Invalid hex field at offset 21: \"0BG8\"");

    let err = DecodeError::UnknownSubtype {
        mode: "charge".into(),
        index: 14,
    };
    assert_eq!(err.to_string(), "Unknown sub-type 14 for mode charge");

    let checksum = UltramatError::Checksum {
        expected: 0x01CC,
        calculated: 0x01CD,
    };
    assert_eq!(checksum.to_string(), "Invalid checksum: expected 01CC, calculated 01CD");
}
