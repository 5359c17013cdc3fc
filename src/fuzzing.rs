//! Entry points for the fuzz targets. Each one feeds untrusted input into a
//! parser and only reports whether it was accepted.
use std::path::Path;

use crate::args::parsers::parse_duration_value;
use crate::config::parse_config;
use crate::wire::{Inbound, classify, decode_frame};

/// Parses a duration with unit suffix (e.g. `500ms`, `2h`).
#[must_use]
pub fn parse_duration_input(input: &str) -> bool {
    parse_duration_value(input).is_ok()
}

/// Decodes one frame from `bytes` under the given size ceiling, returning the
/// consumed length.
#[must_use]
pub fn decode_frame_input(bytes: &[u8], max_bytes: Option<usize>) -> Option<usize> {
    decode_frame(bytes, max_bytes).ok().map(|(_, consumed)| consumed)
}

/// Classifies an inbound message body.
#[must_use]
pub fn classify_input(text: &str) -> Inbound {
    classify(text)
}

/// Parses config text as TOML or JSON, selected by `json`.
#[must_use]
pub fn parse_config_input(content: &str, json: bool) -> bool {
    let path = if json {
        Path::new("agentstorm.json")
    } else {
        Path::new("agentstorm.toml")
    };
    parse_config(path, content).is_ok()
}
