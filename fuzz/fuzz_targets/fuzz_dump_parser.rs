#![no_main]

use dumpdex::source::{Pull, RecordSource, WikimediaOptions, WikimediaSource};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must end in records, exhaustion or an error, never a panic
    let Ok(mut source) = WikimediaSource::from_reader(std::io::Cursor::new(data.to_vec()), WikimediaOptions::default()) else {
        return;
    };
    for _ in 0..10_000 {
        match source.next_record() {
            Ok(Pull::Record(_)) => {}
            Ok(Pull::Exhausted) | Err(_) => break,
        }
    }
    let _ = source.close();
});
