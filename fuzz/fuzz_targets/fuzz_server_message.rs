#![no_main]

use libfuzzer_sys::fuzz_target;
use scribble_client::protocol::ServerMessage;

fuzz_target!(|data: &[u8]| {
    // Relay frames arrive as text; invalid UTF-8 must be rejected cleanly.
    let Ok(msg) = serde_json::from_slice::<ServerMessage>(data) else {
        return;
    };

    // Anything accepted must survive re-encoding and decode to the same frame.
    let encoded = serde_json::to_string(&msg).unwrap_or_default();
    if let Ok(again) = serde_json::from_str::<ServerMessage>(&encoded) {
        assert_eq!(again.name(), msg.name());
    }
});
