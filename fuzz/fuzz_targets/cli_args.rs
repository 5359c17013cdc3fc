#![no_main]

use clap::Parser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut args = vec!["agentstorm".to_owned()];
        for token in input.split_whitespace().take(64) {
            args.push(token.to_owned());
        }
        if let Ok(parsed) = agentstorm::args::HarnessArgs::try_parse_from(&args) {
            debug_assert!(parsed.agents.get() > 0);
            debug_assert!(parsed.target_eps > 0.0);
        }
    }
});
