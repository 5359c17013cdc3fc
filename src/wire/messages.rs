use serde::Serialize;
use serde_json::json;

use crate::error::WireError;

/// Agent version advertised in the identity message.
pub const IDENTITY_VERSION: &str = "3.5.0.1111";

const IDENTITY_BIND_PORT: u16 = 22676;
const IDENTITY_TIMESTAMP: i64 = 1_674_567_131;

/// Builds the identity body sent once per connection before authentication.
///
/// Everything except the name, peer id and token is fixed placeholder data
/// describing a plausible Windows host.
#[must_use]
pub fn build_identity_message(name: &str, peer_id: &str, bootstrap_token: &str) -> String {
    json!({
        "bind_port": IDENTITY_BIND_PORT,
        "can_restart": false,
        "client_token": "",
        "bootstrap_token": bootstrap_token,
        "cpu_model": "Intel(R) Core(TM) i7-6700 CPU @ 3.40GHz",
        "hostname": name,
        "m": "id",
        "macros": {
            "%DOWNLOADS%": "C:\\Users\\WDAGUtilityAccount\\Downloads",
            "%FOLDERS_STORAGE%": "",
            "%HOME%": "C:\\Users\\WDAGUtilityAccount",
            "%USERPROFILE%": "C:\\Users\\WDAGUtilityAccount",
            "/": "\\"
        },
        "name": name,
        "os": "win64",
        "os_user": "WDAGUtilityAccount",
        "os_version": "10.0.19041_workstation_x64",
        "peer": peer_id,
        "settings": {
            "bandwidth": { "down": -1, "up": -1 },
            "foldersStorage": "",
            "restrictedAccess": false
        },
        "storage": "C:\\Users\\WDAGUtilityAccount\\Downloads",
        "tags": [],
        "initialTags": { "VIRTUAL": "true" },
        "ts": IDENTITY_TIMESTAMP,
        "uiv": IDENTITY_VERSION,
        "v": IDENTITY_VERSION
    })
    .to_string()
}

#[derive(Serialize)]
struct EventData {
    time: u64,
}

#[derive(Serialize)]
struct EventRecord {
    id: u64,
    eid: u64,
    ts: i64,
    tick: u64,
    t: u32,
    e: &'static str,
    src: &'static str,
    data: EventData,
}

impl EventRecord {
    const fn startup(ts: i64) -> Self {
        Self {
            id: 0,
            eid: 1,
            ts,
            tick: 0,
            t: 3,
            e: "Startup",
            src: "App",
            data: EventData { time: 0 },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBatch<'a> {
    m: &'static str,
    priority: u32,
    ts: i64,
    events: Vec<EventRecord>,
    confirm_id: &'a str,
}

/// Builds a batch of `count` identical startup events stamped with the
/// current Unix time.
///
/// # Errors
///
/// Returns an error when the batch cannot be serialized.
pub fn build_event_batch(count: usize, confirmation_id: u64) -> Result<String, WireError> {
    build_event_batch_at(count, confirmation_id, chrono::Utc::now().timestamp())
}

/// Same as [`build_event_batch`] with an explicit timestamp.
///
/// # Errors
///
/// Returns an error when the batch cannot be serialized.
pub fn build_event_batch_at(
    count: usize,
    confirmation_id: u64,
    ts: i64,
) -> Result<String, WireError> {
    let confirm_id = confirmation_id.to_string();
    let batch = EventBatch {
        m: "events",
        priority: 0,
        ts,
        events: (0..count).map(|_| EventRecord::startup(ts)).collect(),
        confirm_id: &confirm_id,
    };
    serde_json::to_string(&batch).map_err(|source| WireError::Serialize {
        context: "event batch",
        source,
    })
}
