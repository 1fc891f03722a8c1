#![no_main]
use libfuzzer_sys::fuzz_target;
use flowvol::decode_mha;

fuzz_target!(|data: &[u8]| {
    if let Ok(obj) = decode_mha(data) {
        let grid = obj.grid();
        let _ = grid.magnitude();
        let _ = obj.header().expected_payload_len();
    }
});
