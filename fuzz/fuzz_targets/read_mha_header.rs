#![no_main]
use libfuzzer_sys::fuzz_target;
use flowvol::MhaHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = MhaHeader::from_reader(data) {
        let header = parsed.header;
        let _ = header.expected_payload_len();
        let _ = header.offset_triple();
        let _ = header.to_string();
    }
});
