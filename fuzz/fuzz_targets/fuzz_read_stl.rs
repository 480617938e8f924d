#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must produce a solid or an error, never a panic
    if let Ok(solid) = fastener_assembly::stl::read_stl(Cursor::new(data)) {
        assert!(solid.vertex_count() > 0);
        assert!(solid
            .triangles()
            .iter()
            .all(|t| t.indices().iter().all(|&i| i < solid.vertex_count())));
    }
});
