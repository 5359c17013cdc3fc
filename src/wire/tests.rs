use super::*;
use crate::error::{AppError, AppResult, WireError};
use crate::test_support::run_async_test;
use tokio::io::AsyncWriteExt;

#[test]
fn encode_prefixes_big_endian_length() -> AppResult<()> {
    let frame = encode_message("hello")?;
    if frame.get(..4) != Some(&[0, 0, 0, 5][..]) {
        return Err(AppError::validation(format!(
            "Unexpected prefix: {:?}",
            frame.get(..4)
        )));
    }
    if frame.get(4..) != Some(&b"hello"[..]) {
        return Err(AppError::validation("Unexpected body bytes"));
    }
    Ok(())
}

#[test]
fn read_message_returns_body_after_write() -> AppResult<()> {
    run_async_test(async {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_message(&mut client, "{\"m\":\"confirm\"}").await?;
        write_message(&mut client, "").await?;
        let first = read_message(&mut server, None).await?;
        let second = read_message(&mut server, None).await?;
        if first != "{\"m\":\"confirm\"}" || !second.is_empty() {
            return Err(AppError::validation(format!(
                "Unexpected bodies: {first:?}, {second:?}"
            )));
        }
        Ok(())
    })
}

#[test]
fn body_shorter_than_prefix_is_truncated() -> AppResult<()> {
    run_async_test(async {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&[0, 0, 0, 10, b'a', b'b'])
            .await
            .map_err(|err| AppError::validation(format!("write failed: {err}")))?;
        drop(client);
        match read_message(&mut server, None).await {
            Err(WireError::TruncatedStream {
                expected: 10,
                received: 2,
            }) => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected truncated stream, got {other:?}"
            ))),
        }
    })
}

#[test]
fn partial_prefix_is_truncated() -> AppResult<()> {
    run_async_test(async {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&[0, 0])
            .await
            .map_err(|err| AppError::validation(format!("write failed: {err}")))?;
        drop(client);
        match read_message(&mut server, None).await {
            Err(WireError::TruncatedStream {
                expected: LENGTH_PREFIX_BYTES,
                received: 2,
            }) => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected truncated prefix, got {other:?}"
            ))),
        }
    })
}

#[test]
fn clean_close_before_prefix_is_connection_closed() -> AppResult<()> {
    run_async_test(async {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        match read_message(&mut server, None).await {
            Err(WireError::ConnectionClosed) => Ok(()),
            other => Err(AppError::validation(format!(
                "Expected connection closed, got {other:?}"
            ))),
        }
    })
}

#[test]
fn oversized_frame_is_rejected_before_body_read() -> AppResult<()> {
    match decode_frame(&[0, 0, 1, 0], Some(255)) {
        Err(WireError::FrameTooLarge {
            len: 256,
            max_bytes: 255,
        }) => Ok(()),
        other => Err(AppError::validation(format!(
            "Expected frame too large, got {other:?}"
        ))),
    }
}

#[test]
fn decode_frame_reports_consumed_bytes() -> AppResult<()> {
    let mut buffer = encode_message("one")?;
    buffer.extend(encode_message("two")?);
    let (first, consumed) = decode_frame(&buffer, None)?;
    let rest = buffer
        .get(consumed..)
        .ok_or_else(|| AppError::validation("Consumed past buffer end"))?;
    let (second, _) = decode_frame(rest, None)?;
    if first != "one" || second != "two" || consumed != 7 {
        return Err(AppError::validation(format!(
            "Unexpected decode: {first:?} {second:?} {consumed}"
        )));
    }
    Ok(())
}

#[test]
fn invalid_utf8_body_is_rejected() -> AppResult<()> {
    match decode_frame(&[0, 0, 0, 2, 0xff, 0xfe], None) {
        Err(WireError::InvalidUtf8 { .. }) => Ok(()),
        other => Err(AppError::validation(format!(
            "Expected invalid UTF-8, got {other:?}"
        ))),
    }
}

#[test]
fn identity_carries_name_peer_and_token() -> AppResult<()> {
    let body = build_identity_message("FakeAgent_ABC", "EA2ULYEX7D6TG4MAABC", "secret");
    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|err| AppError::validation(format!("identity is not JSON: {err}")))?;
    let expected: serde_json::Value = serde_json::from_str(
        r#"{
            "bind_port": 22676,
            "can_restart": false,
            "client_token": "",
            "bootstrap_token": "secret",
            "cpu_model": "Intel(R) Core(TM) i7-6700 CPU @ 3.40GHz",
            "hostname": "FakeAgent_ABC",
            "m": "id",
            "macros": {
                "%DOWNLOADS%": "C:\\Users\\WDAGUtilityAccount\\Downloads",
                "%FOLDERS_STORAGE%": "",
                "%HOME%": "C:\\Users\\WDAGUtilityAccount",
                "%USERPROFILE%": "C:\\Users\\WDAGUtilityAccount",
                "/": "\\"
            },
            "name": "FakeAgent_ABC",
            "os": "win64",
            "os_user": "WDAGUtilityAccount",
            "os_version": "10.0.19041_workstation_x64",
            "peer": "EA2ULYEX7D6TG4MAABC",
            "settings": {
                "bandwidth": { "down": -1, "up": -1 },
                "foldersStorage": "",
                "restrictedAccess": false
            },
            "storage": "C:\\Users\\WDAGUtilityAccount\\Downloads",
            "tags": [],
            "initialTags": { "VIRTUAL": "true" },
            "ts": 1674567131,
            "uiv": "3.5.0.1111",
            "v": "3.5.0.1111"
        }"#,
    )
    .map_err(|err| AppError::validation(format!("template is not JSON: {err}")))?;
    if value != expected {
        return Err(AppError::validation(format!(
            "Identity differs from the agent template: {value}"
        )));
    }
    if value["v"] != IDENTITY_VERSION {
        return Err(AppError::validation("Unexpected version"));
    }
    Ok(())
}

#[test]
fn event_batch_has_count_events_and_string_confirm_id() -> AppResult<()> {
    let body = build_event_batch_at(3, 42, 1_700_000_000)?;
    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|err| AppError::validation(format!("batch is not JSON: {err}")))?;
    let events = value["events"]
        .as_array()
        .ok_or_else(|| AppError::validation("events is not an array"))?;
    let checks = [
        (value["m"] == "events", "Expected m=events"),
        (value["priority"] == 0, "Unexpected priority"),
        (value["confirmId"] == "42", "Expected string confirmId"),
        (events.len() == 3, "Unexpected event count"),
        (
            events.iter().all(|event| {
                event["ts"] == 1_700_000_000 && event["e"] == "Startup" && event["t"] == 3
            }),
            "Unexpected event record",
        ),
    ];
    for (ok, msg) in checks {
        if !ok {
            return Err(AppError::validation(msg));
        }
    }
    Ok(())
}

#[test]
fn event_batch_survives_framing() -> AppResult<()> {
    run_async_test(async {
        let body = build_event_batch(7, 9001)?;
        let frame = encode_message(&body)?;
        let (decoded, consumed) = decode_frame(&frame, Some(DEFAULT_MAX_FRAME_BYTES))?;

        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        write_message(&mut client, &body).await?;
        let streamed = read_message(&mut server, Some(DEFAULT_MAX_FRAME_BYTES)).await?;

        for text in [&decoded, &streamed] {
            let value: serde_json::Value = serde_json::from_str(text)
                .map_err(|err| AppError::validation(format!("batch is not JSON: {err}")))?;
            let events = value["events"].as_array().map_or(0, Vec::len);
            if events != 7 || value["confirmId"] != "9001" || !value["confirmId"].is_string() {
                return Err(AppError::validation(format!("Unexpected batch: {value}")));
            }
        }
        if consumed != frame.len() || decoded != body {
            return Err(AppError::validation(format!(
                "Frame not consumed exactly: {consumed} of {}",
                frame.len()
            )));
        }
        Ok(())
    })
}

#[test]
fn classify_uses_markers_only() -> AppResult<()> {
    let cases = [
        (
            "{\"subsystem\":\"auth\",\"status\":\"approved\"}",
            Inbound::AuthApproved,
        ),
        ("{\"subsystem\":\"auth\",\"status\":\"denied\"}", Inbound::Unrecognized),
        ("{\"status\":\"approved\"}", Inbound::Unrecognized),
        ("{\"m\":\"confirm\",\"id\":\"7\"}", Inbound::Confirm),
        ("{\"m\":\"ping\"}", Inbound::Unrecognized),
        ("not json at all \"m\":\"confirm\"", Inbound::Confirm),
    ];
    for (text, expected) in cases {
        let actual = classify(text);
        if actual != expected {
            return Err(AppError::validation(format!(
                "classify({text}) = {actual:?}, expected {expected:?}"
            )));
        }
    }
    Ok(())
}
