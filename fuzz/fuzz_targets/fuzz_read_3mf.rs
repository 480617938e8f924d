#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let _ = fastener_assembly::threemf::read_threemf(Cursor::new(data));

    // The model XML parser is also reachable directly
    if let Ok(xml) = std::str::from_utf8(data) {
        let _ = fastener_assembly::threemf::parse_model_xml(xml);
    }
});
