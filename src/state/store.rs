//! State store - a single task owns the coordination record
//!
//! Loops send `StateUpdate`s through a `StateHandle`. The owner applies them one
//! at a time, rewrites the durable snapshot, then publishes the new record on a
//! watch channel and acknowledges the sender. Snapshot writes are therefore
//! serialized and always reflect every update applied so far.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error};
use tokio::sync::{mpsc, oneshot, watch};

use super::record::{CoordinationState, StateUpdate};
use crate::error::{Result, TriloopError};

const UPDATE_CHANNEL_CAPACITY: usize = 32;

struct Envelope {
    update: StateUpdate,
    ack: oneshot::Sender<Result<CoordinationState>>,
}

/// Owner of the coordination record. Drive it with `run`.
pub struct StateStore {
    path: PathBuf,
    state: CoordinationState,
    updates: mpsc::Receiver<Envelope>,
    snapshots: watch::Sender<CoordinationState>,
}

/// Cloneable access to the record for the role loops
#[derive(Clone)]
pub struct StateHandle {
    updates: mpsc::Sender<Envelope>,
    snapshots: watch::Receiver<CoordinationState>,
}

impl StateStore {
    /// Create a fresh record, persist it at `path`, and return the owner plus a handle.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, StateHandle)> {
        let path = path.as_ref().to_path_buf();
        let state = CoordinationState::new();
        write_snapshot(&path, &state)?;

        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());

        let store = Self {
            path,
            state,
            updates: update_rx,
            snapshots: snapshot_tx,
        };
        let handle = StateHandle {
            updates: update_tx,
            snapshots: snapshot_rx,
        };
        Ok((store, handle))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply updates until every handle is dropped.
    ///
    /// A failed snapshot write is reported to the update that caused it and
    /// stops the store; later updates fail with a storage error.
    pub async fn run(mut self) -> Result<()> {
        while let Some(Envelope { update, ack }) = self.updates.recv().await {
            let owner = update.owner();
            let mut next = self.state.clone();
            next.apply(update);

            if let Err(e) = persist(&self.path, &next).await {
                error!("Failed to persist state after {} update: {}", owner, e);
                let message = e.to_string();
                let _ = ack.send(Err(TriloopError::Storage(message.clone())));
                return Err(TriloopError::Storage(message));
            }

            debug!("Applied {} update (iteration {})", owner, next.iteration);
            self.state = next;
            self.snapshots.send_replace(self.state.clone());
            let _ = ack.send(Ok(self.state.clone()));
        }
        Ok(())
    }
}

impl StateHandle {
    /// Latest published record
    pub fn snapshot(&self) -> CoordinationState {
        self.snapshots.borrow().clone()
    }

    /// Send an update and wait until it is applied and persisted.
    pub async fn apply(&self, update: StateUpdate) -> Result<CoordinationState> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.updates
            .send(Envelope { update, ack: ack_tx })
            .await
            .map_err(|_| TriloopError::Storage("state store is closed".to_string()))?;
        ack_rx
            .await
            .map_err(|_| TriloopError::Storage("state store stopped before acknowledging".to_string()))?
    }
}

/// Read a durable snapshot back from disk
pub fn load_snapshot(path: &Path) -> Result<CoordinationState> {
    let contents = fs::read_to_string(path)
        .map_err(|e| TriloopError::Storage(format!("read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&contents)?)
}

fn render(state: &CoordinationState) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    Ok(buf)
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

/// Synchronous snapshot write, used once at start-up
fn write_snapshot(path: &Path, state: &CoordinationState) -> Result<()> {
    let buf = render(state)?;
    let storage_err = |what: &str, p: &Path, e: std::io::Error| {
        TriloopError::Storage(format!("{} {}: {}", what, p.display(), e))
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| storage_err("create directory", parent, e))?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, buf).map_err(|e| storage_err("write", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| storage_err("replace", path, e))?;
    Ok(())
}

/// Whole-snapshot rewrite via temp file + rename
async fn persist(path: &Path, state: &CoordinationState) -> Result<()> {
    let buf = render(state)?;
    let storage_err = |what: &str, p: &Path, e: std::io::Error| {
        TriloopError::Storage(format!("{} {}: {}", what, p.display(), e))
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_err("create directory", parent, e))?;
    }
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, buf).await.map_err(|e| storage_err("write", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_err("replace", path, e))?;
    Ok(())
}
