#![no_main]

use libfuzzer_sys::fuzz_target;
use ultramat_rs::protocol::command::{parse_answer, parse_words};

fuzz_target!(|data: &[u8]| {
    if let Some((&len, rest)) = data.split_first() {
        if let Ok((_, payload)) = parse_answer(rest, len as usize) {
            let _ = parse_words(payload);
        }
    }
    let _ = parse_words(data);
});
