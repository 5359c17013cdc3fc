#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(consumed) = agentstorm::fuzzing::decode_frame_input(data, Some(1 << 16)) {
        debug_assert!(consumed >= agentstorm::wire::LENGTH_PREFIX_BYTES);
        debug_assert!(consumed <= data.len());
    }
});
