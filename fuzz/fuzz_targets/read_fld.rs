#![no_main]
use libfuzzer_sys::fuzz_target;
use flowvol::decode_fld;

fuzz_target!(|data: &[u8]| {
    if let Ok(obj) = decode_fld(data) {
        let _ = obj.header().spacing();
        let _ = obj.to_bytes();
    }
});
