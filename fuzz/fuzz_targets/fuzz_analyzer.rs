#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for token in dumpdex::utils::analyze(&text) {
        assert!(!token.is_empty());
        assert!(token.len() <= dumpdex::utils::MAX_TOKEN_LENGTH);
    }
    let _ = dumpdex::utils::normalize_term(&text);
});
