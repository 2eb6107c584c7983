//! Debounced JSON snapshots of the in-memory store.
//!
//! A single background task owns all file writes, so writes never overlap.
//! Triggers that arrive while a write is pending collapse into one write of
//! the latest state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::Link;
use crate::error::AppError;

/// One persisted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(alias = "short_url")]
    pub short_id: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Link> for SnapshotRecord {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id,
            short_id: link.short_id.clone(),
            original_url: link.original_url.clone(),
            user_id: link.owner_id.clone(),
            is_deleted: link.is_deleted,
            created_at: Some(link.created_at),
        }
    }
}

/// State that can be captured for a snapshot.
pub trait SnapshotSource: Send + Sync + 'static {
    fn snapshot(&self) -> Vec<SnapshotRecord>;
}

/// Reads a snapshot file.
///
/// Returns `Ok(None)` when the file does not exist.
pub async fn read_snapshot(path: &Path) -> Result<Option<Vec<SnapshotRecord>>, AppError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(AppError::internal(
                "Failed to read snapshot file",
                json!({ "path": path.display().to_string(), "reason": e.to_string() }),
            ));
        }
    };

    serde_json::from_slice(&raw).map(Some).map_err(|e| {
        AppError::internal(
            "Failed to parse snapshot file",
            json!({ "path": path.display().to_string(), "reason": e.to_string() }),
        )
    })
}

/// Loads records for startup.
///
/// A missing or unreadable file yields an empty list; it is never fatal.
pub async fn load_snapshot(path: &Path) -> Vec<SnapshotRecord> {
    match read_snapshot(path).await {
        Ok(Some(records)) => {
            info!(path = %path.display(), count = records.len(), "Snapshot loaded");
            records
        }
        Ok(None) => {
            debug!(path = %path.display(), "No snapshot file, starting empty");
            Vec::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load snapshot, starting empty");
            Vec::new()
        }
    }
}

/// Writes `payload` and flushes it to disk before returning.
async fn write_durably(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

/// Writes `records` to `path` through a temp file and an atomic rename.
pub async fn write_snapshot(path: &Path, records: &[SnapshotRecord]) -> Result<(), AppError> {
    let io_error = |stage: &str, e: std::io::Error| {
        AppError::internal(
            format!("Failed to {stage} snapshot"),
            json!({ "path": path.display().to_string(), "reason": e.to_string() }),
        )
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("prepare directory for", e))?;
    }

    let payload = serde_json::to_vec_pretty(records).map_err(|e| {
        AppError::internal(
            "Failed to encode snapshot",
            json!({ "reason": e.to_string() }),
        )
    })?;

    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    if let Err(e) = write_durably(&temp_path, &payload).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_error("write", e));
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_error("finalize", e));
    }

    Ok(())
}

/// Handle to the background snapshot task.
pub struct SnapshotWriter {
    trigger: mpsc::Sender<()>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    path: PathBuf,
}

impl SnapshotWriter {
    /// Starts the writer task for `source`.
    pub fn spawn(path: PathBuf, source: Arc<dyn SnapshotSource>, debounce: Duration) -> Self {
        let (trigger, requests) = mpsc::channel(1);
        let (stop, stopped) = watch::channel(false);

        let task = tokio::spawn(run_snapshot_writer(
            path.clone(),
            source,
            debounce,
            requests,
            stopped,
        ));

        Self {
            trigger,
            stop,
            task: Mutex::new(Some(task)),
            path,
        }
    }

    /// Schedules a write of the current state. Never blocks.
    pub fn request(&self) {
        // A full channel already means a write is pending.
        let _ = self.trigger.try_send(());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stops the task after writing any pending state.
    pub async fn shutdown(&self) {
        let _ = self.stop.send(true);

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            error!(error = %e, "Snapshot writer panicked");
        }
    }
}

async fn run_snapshot_writer(
    path: PathBuf,
    source: Arc<dyn SnapshotSource>,
    debounce: Duration,
    mut requests: mpsc::Receiver<()>,
    mut stopped: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stopped.changed() => break,
            request = requests.recv() => {
                if request.is_none() {
                    break;
                }
            }
        }

        // Let a burst of mutations settle before writing.
        let stop_requested = tokio::select! {
            _ = tokio::time::sleep(debounce) => false,
            _ = stopped.changed() => true,
        };

        while requests.try_recv().is_ok() {}
        persist(&path, source.as_ref()).await;

        if stop_requested {
            return;
        }
    }

    if requests.try_recv().is_ok() {
        persist(&path, source.as_ref()).await;
    }
    debug!(path = %path.display(), "Snapshot writer stopped");
}

async fn persist(path: &Path, source: &dyn SnapshotSource) {
    let records = source.snapshot();

    match write_snapshot(path, &records).await {
        Ok(()) => {
            metrics::counter!("snapshot_writes_total").increment(1);
            debug!(path = %path.display(), count = records.len(), "Snapshot written");
        }
        Err(e) => {
            metrics::counter!("snapshot_failures_total").increment(1);
            error!(path = %path.display(), error = %e, "Failed to write snapshot");
        }
    }
}
