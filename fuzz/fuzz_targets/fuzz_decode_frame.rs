#![no_main]

use libfuzzer_sys::fuzz_target;
use ultramat_rs::{classify, decode, decode_linked, is_linked, DeviceVariant};

fuzz_target!(|data: &[u8]| {
    // Decoding never panics, whatever the frame holds or however short it is
    for variant in DeviceVariant::ALL {
        let layout = variant.layout();
        for number in 0..=layout.outlet_count() + 1 {
            let _ = classify(layout, number, data);
            let points = decode(layout, number, data);
            assert!(points.len() <= layout.points_len(number));
        }
        let _ = is_linked(layout, data);
        let _ = decode_linked(layout, data);
    }
});
