#![no_main]

use libfuzzer_sys::fuzz_target;
use scribble_client::protocol::ClientMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(msg) = serde_json::from_str::<ClientMessage>(s) {
            let _ = serde_json::to_string(&msg);
        }
    }
});
