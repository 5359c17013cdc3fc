use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult, SessionError};
use crate::transport::{BoxedStream, Connector};
use crate::wire::{read_message, write_message};

pub(crate) const APPROVED: &str = "{\"subsystem\":\"auth\",\"status\":\"approved\"}";
pub(crate) const CONFIRM: &str = "{\"m\":\"confirm\"}";
pub(crate) const PING: &str = "{\"m\":\"ping\"}";

pub(crate) fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// Like [`run_async_test`] with the clock paused, so sleeps complete as soon
/// as every task is idle.
pub(crate) fn run_paused_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthReply {
    Approve,
    /// Never approves; answers with a non-approved auth status instead.
    Deny,
}

/// Per-connection behaviour of the in-memory server.
#[derive(Debug, Clone)]
pub(crate) struct ServerBehavior {
    pub(crate) auth: AuthReply,
    pub(crate) confirm_delay: Duration,
    /// Replace the confirm of every Nth batch with pings.
    pub(crate) drop_every: Option<u64>,
    pub(crate) pings_per_drop: usize,
    /// After this many batches, answer the next one with a frame that
    /// declares 10 body bytes, send 2 of them, and close.
    pub(crate) truncate_after: Option<u64>,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            auth: AuthReply::Approve,
            confirm_delay: Duration::from_millis(10),
            drop_every: None,
            pings_per_drop: 3,
            truncate_after: None,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ServerStats {
    pub(crate) connections: AtomicUsize,
    pub(crate) batches: AtomicU64,
    pub(crate) confirms: AtomicU64,
    /// Batches that arrived while an earlier one from the same connection
    /// was still unconfirmed.
    pub(crate) overlapping_batches: AtomicU64,
    pub(crate) confirm_ids: Mutex<Vec<String>>,
}

impl ServerStats {
    pub(crate) fn confirm_ids(&self) -> Vec<String> {
        self.confirm_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

type BehaviorFn = dyn Fn(usize) -> ServerBehavior + Send + Sync;

/// Connector handing out in-memory streams, each served by a fake server
/// task. `behavior` receives the zero-based connection index.
pub(crate) struct FakeConnector {
    behavior: Box<BehaviorFn>,
    pub(crate) stats: Arc<ServerStats>,
}

impl FakeConnector {
    pub(crate) fn new<F>(behavior: F) -> Self
    where
        F: Fn(usize) -> ServerBehavior + Send + Sync + 'static,
    {
        Self {
            behavior: Box::new(behavior),
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub(crate) fn healthy() -> Self {
        Self::new(|_| ServerBehavior::default())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<BoxedStream, SessionError> {
        let index = self.stats.connections.fetch_add(1, Ordering::AcqRel);
        let behavior = (self.behavior)(index);
        let (client, server) = tokio::io::duplex(256 * 1024);
        tokio::spawn(serve(server, behavior, Arc::clone(&self.stats)));
        Ok(Box::new(client))
    }
}

/// Connector that always fails to connect.
pub(crate) struct RefusingConnector;

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self) -> Result<BoxedStream, SessionError> {
        Err(SessionError::Connect {
            addr: "127.0.0.1:1".to_owned(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        })
    }
}

async fn serve(stream: DuplexStream, behavior: ServerBehavior, stats: Arc<ServerStats>) {
    let (mut reader, mut writer) = tokio::io::split(stream);
    if read_message(&mut reader, None).await.is_err() {
        return;
    }
    let auth_reply = match behavior.auth {
        AuthReply::Approve => APPROVED,
        AuthReply::Deny => "{\"subsystem\":\"auth\",\"status\":\"denied\"}",
    };
    for _ in 0..4 {
        if write_message(&mut writer, auth_reply).await.is_err() {
            return;
        }
        if behavior.auth == AuthReply::Approve {
            break;
        }
    }
    if behavior.auth == AuthReply::Deny {
        return;
    }

    let in_flight = Arc::new(AtomicU64::new(0));
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<()>();
    let reader_task = {
        let stats = Arc::clone(&stats);
        let in_flight = Arc::clone(&in_flight);
        tokio::spawn(async move {
            while let Ok(message) = read_message(&mut reader, None).await {
                if !message.contains("\"m\":\"events\"") {
                    continue;
                }
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&message)
                    && let Some(id) = value.get("confirmId").and_then(|id| id.as_str())
                {
                    stats
                        .confirm_ids
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(id.to_owned());
                }
                if in_flight.fetch_add(1, Ordering::AcqRel) != 0 {
                    stats.overlapping_batches.fetch_add(1, Ordering::AcqRel);
                }
                stats.batches.fetch_add(1, Ordering::AcqRel);
                if batch_tx.send(()).is_err() {
                    break;
                }
            }
        })
    };

    let mut served = 0u64;
    while batch_rx.recv().await.is_some() {
        served = served.saturating_add(1);
        if behavior
            .truncate_after
            .is_some_and(|limit| served > limit)
        {
            if writer.write_all(&[0, 0, 0, 10, b'{', b'"']).await.is_ok() {
                drop(writer.flush().await);
            }
            break;
        }
        if !behavior.confirm_delay.is_zero() {
            tokio::time::sleep(behavior.confirm_delay).await;
        }
        in_flight.fetch_sub(1, Ordering::AcqRel);
        let dropped = behavior
            .drop_every
            .is_some_and(|every| every > 0 && served % every == 0);
        if dropped {
            for _ in 0..behavior.pings_per_drop {
                if write_message(&mut writer, PING).await.is_err() {
                    return;
                }
            }
            continue;
        }
        if write_message(&mut writer, CONFIRM).await.is_err() {
            break;
        }
        stats.confirms.fetch_add(1, Ordering::AcqRel);
    }
    reader_task.abort();
}
