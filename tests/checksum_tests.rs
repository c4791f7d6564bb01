//! Tests for the additive frame checksum and the fixed command frames.

use proptest::prelude::*;
use ultramat_rs::protocol::frame::{
    additive_sum, build_frame, encode_checksum, is_valid, verify_answer_checksum, verify_checksum,
    Frame,
};
use ultramat_rs::{UltramatError, RESET, RESET_CONFIG};

#[test]
fn test_reset_commands_are_bit_exact() {
    assert_eq!(RESET, [0x0C, 0x43, 0x30, 0x30, 0x30, 0x30, 0x30, 0x44, 0x33, 0x0D]);
    assert_eq!(RESET_CONFIG, [0x0C, 0x41, 0x37, 0x30, 0x30, 0x30, 0x30, 0x44, 0x38, 0x0D]);
    assert_eq!(build_frame(b"C000"), RESET.to_vec());
    assert_eq!(build_frame(b"A700"), RESET_CONFIG.to_vec());
    assert!(is_valid(&RESET));
    assert!(is_valid(&RESET_CONFIG));
}

#[test]
fn test_sum_wraps_at_16_bits() {
    let payload = vec![0xFFu8; 300];
    assert_eq!(additive_sum(&payload), (300u32 * 0xFF % 0x1_0000) as u16);
    assert_eq!(&encode_checksum(&payload), b"2AD4");
}

#[test]
fn test_checksum_is_uppercase_hex() {
    assert_eq!(&encode_checksum(b"0BB803E8"), b"01CC");
    assert!(is_valid(b"\x0c0BB803E801CC\x0d"));
}

#[test]
fn test_mismatch_reports_both_sums() {
    let mut frame = build_frame(b"0001");
    frame[4] = b'2';
    match verify_checksum(&frame) {
        Err(UltramatError::Checksum { expected, calculated }) => {
            assert_eq!(expected, 0xC1);
            assert_eq!(calculated, 0xC2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_answer_trailer_skips_ack() {
    assert!(verify_answer_checksum(b"\x0c000100C1\x0d\x06").is_ok());
    assert!(verify_answer_checksum(b"\x0c000100C2\x0d\x06").is_err());
}

#[test]
fn test_frame_parse() {
    let frame = Frame::parse(build_frame(b"0BB8")).unwrap();
    assert_eq!(frame.len(), 10);
    assert_eq!(frame.field(1, 4).unwrap(), b"0BB8");
    assert!(matches!(
        Frame::parse(b"\x0d0BB800000\x0c".to_vec()),
        Err(UltramatError::Framing(_))
    ));
}

proptest! {
    #[test]
    fn prop_built_frames_are_valid(payload in proptest::collection::vec(any::<u8>(), 0..200)) {
        prop_assert!(is_valid(&build_frame(&payload)));
    }

    #[test]
    fn prop_flipped_payload_byte_is_detected(
        payload in proptest::collection::vec(any::<u8>(), 1..200),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut frame = build_frame(&payload);
        let i = 1 + position.index(payload.len());
        frame[i] ^= mask;
        prop_assert!(!is_valid(&frame));
    }
}
