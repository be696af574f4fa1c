#![no_main]

use libfuzzer_sys::fuzz_target;
use slipstream_core::RateWindow;

fuzz_target!(|data: &[u8]| {
    if let Ok(spec) = std::str::from_utf8(data) {
        // Arbitrary input may be rejected, but must never panic.
        let _ = RateWindow::parse(spec);
    }
});
