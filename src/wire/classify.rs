pub const AUTH_SUBSYSTEM_MARKER: &str = "\"subsystem\":\"auth\"";
pub const AUTH_APPROVED_MARKER: &str = "\"status\":\"approved\"";
pub const CONFIRM_MARKER: &str = "\"m\":\"confirm\"";

/// What an inbound message means to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    AuthApproved,
    Confirm,
    Unrecognized,
}

/// Classifies a message by marker substrings only. Anything that carries
/// neither marker set is `Unrecognized` and ignored by callers.
#[must_use]
pub fn classify(text: &str) -> Inbound {
    if is_auth_approved(text) {
        Inbound::AuthApproved
    } else if is_confirm(text) {
        Inbound::Confirm
    } else {
        Inbound::Unrecognized
    }
}

#[must_use]
pub fn is_auth_approved(text: &str) -> bool {
    text.contains(AUTH_SUBSYSTEM_MARKER) && text.contains(AUTH_APPROVED_MARKER)
}

#[must_use]
pub fn is_confirm(text: &str) -> bool {
    text.contains(CONFIRM_MARKER)
}
