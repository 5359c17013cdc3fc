#![no_main]

use agentstorm::wire::Inbound;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match agentstorm::fuzzing::classify_input(input) {
            Inbound::Confirm => debug_assert!(agentstorm::wire::is_confirm(input)),
            Inbound::AuthApproved => debug_assert!(agentstorm::wire::is_auth_approved(input)),
            Inbound::Unrecognized => {}
        }
    }
});
