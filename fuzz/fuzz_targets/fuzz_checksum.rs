#![no_main]

use libfuzzer_sys::fuzz_target;
use ultramat_rs::protocol::frame::{build_frame, is_valid, verify_answer_checksum, Frame};

fuzz_target!(|data: &[u8]| {
    let _ = is_valid(data);
    let _ = verify_answer_checksum(data);
    let _ = Frame::parse(data.to_vec());

    // Any payload survives framing
    assert!(is_valid(&build_frame(data)));
});
