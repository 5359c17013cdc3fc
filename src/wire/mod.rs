//! Length-prefixed text framing and the agent message shapes.
//!
//! Every message on the wire is a UTF-8 body preceded by its byte length as a
//! 4-byte big-endian integer. Outbound bodies are built here; inbound bodies
//! are only classified, never parsed.
mod classify;
mod frame;
mod messages;

#[cfg(test)]
mod tests;

pub use classify::{
    AUTH_APPROVED_MARKER, AUTH_SUBSYSTEM_MARKER, CONFIRM_MARKER, Inbound, classify,
    is_auth_approved, is_confirm,
};
pub use frame::{
    DEFAULT_MAX_FRAME_BYTES, LENGTH_PREFIX_BYTES, decode_frame, encode_message, read_message,
    write_message,
};
pub use messages::{
    IDENTITY_VERSION, build_event_batch, build_event_batch_at, build_identity_message,
};
