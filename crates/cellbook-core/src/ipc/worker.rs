//! Worker process management for cellbook cell execution.
//!
//! Provides [`ProcessUnit`], an execution unit backed by an isolated
//! `cellbook-worker` child process, and [`ProcessSpawner`] which starts them.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::execute::{ExecutionUnit, UnitEvent, UnitEvents, UnitSpawner};

use super::protocol::{WorkerCommand, WorkerResponse, encode, read_message_async};

/// Environment variable overriding worker binary discovery.
pub const WORKER_PATH_ENV: &str = "CELLBOOK_WORKER_PATH";

fn worker_name() -> &'static str {
    if cfg!(windows) {
        "cellbook-worker.exe"
    } else {
        "cellbook-worker"
    }
}

/// Find the cellbook-worker binary path.
///
/// Looks in the following order:
/// 1. `CELLBOOK_WORKER_PATH` environment variable
/// 2. Same directory as the current executable
/// 3. System PATH
/// 4. `target/debug` and `target/release` of this workspace
pub fn find_worker_binary() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(WORKER_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", WORKER_PATH_ENV, path.display());
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let worker_path = exe_dir.join(worker_name());
        if worker_path.exists() {
            return Ok(worker_path);
        }
        // Test binaries live one level down, in target/<profile>/deps.
        if let Some(profile_dir) = exe_dir.parent() {
            let worker_path = profile_dir.join(worker_name());
            if worker_path.exists() {
                return Ok(worker_path);
            }
        }
    }

    if let Ok(path) = which::which(worker_name()) {
        return Ok(path);
    }

    let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    for profile in ["debug", "release"] {
        let path = workspace.join("target").join(profile).join(worker_name());
        if path.exists() {
            return Ok(path.canonicalize().unwrap_or(path));
        }
    }

    Err(Error::Ipc(format!(
        "Could not find cellbook-worker binary. Set {} or ensure it's in PATH.",
        WORKER_PATH_ENV
    )))
}

/// Execution unit running in a child process.
///
/// Commands are framed on dispatch, so an oversized one fails right there,
/// and a writer task copies the frames onto the child's stdin. A reader task
/// turns frames from its stdout into [`UnitEvent`]s. The child is killed when
/// the unit is terminated or dropped.
pub struct ProcessUnit {
    child: Child,
    frames: Option<mpsc::UnboundedSender<Vec<u8>>>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ProcessUnit {
    /// Spawn a worker and send it a liveness ping.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(worker_path: &Path) -> Result<(Self, UnitEvents)> {
        let mut child = Command::new(worker_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Let worker stderr pass through for debugging
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Ipc(format!(
                    "Failed to spawn worker process '{}': {}",
                    worker_path.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Ipc("Failed to get worker stdin".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Ipc("Failed to get worker stdout".to_string()))?;
        let pid = child.id().unwrap_or_default();

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let written = match stdin.write_all(&frame).await {
                    Ok(()) => stdin.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    tracing::warn!("Worker {} stopped accepting commands: {}", pid, e);
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            loop {
                match read_message_async::<_, WorkerResponse>(&mut stdout).await {
                    Ok(response) => {
                        let last = matches!(response, WorkerResponse::ShuttingDown);
                        if event_tx.send(UnitEvent::Response(response)).is_err() || last {
                            break;
                        }
                    }
                    Err(Error::Disconnected) => {
                        let _ = event_tx.send(UnitEvent::Crashed(format!("worker {} exited", pid)));
                        break;
                    }
                    Err(e) => {
                        let _ = event_tx.send(UnitEvent::Crashed(e.to_string()));
                        break;
                    }
                }
            }
        });

        frame_tx
            .send(encode(&WorkerCommand::Ping)?)
            .map_err(|_| Error::Ipc("Worker writer task ended before ping".to_string()))?;
        let unit = Self {
            child,
            frames: Some(frame_tx),
            writer,
            reader,
        };

        tracing::debug!("Spawned worker {} from {}", pid, worker_path.display());
        Ok((unit, event_rx))
    }
}

impl ExecutionUnit for ProcessUnit {
    fn dispatch(&mut self, command: WorkerCommand) -> Result<()> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| Error::UnitCrash("worker has been terminated".to_string()))?;
        frames
            .send(encode(&command)?)
            .map_err(|_| Error::UnitCrash("worker is no longer accepting commands".to_string()))
    }

    fn terminate(&mut self) {
        self.frames = None;
        self.reader.abort();
        self.writer.abort();
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Worker already gone: {}", e);
        }
    }
}

impl Drop for ProcessUnit {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Spawns [`ProcessUnit`]s from a located worker binary.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    worker_path: PathBuf,
}

impl ProcessSpawner {
    pub fn new(worker_path: impl Into<PathBuf>) -> Self {
        Self {
            worker_path: worker_path.into(),
        }
    }

    /// Spawner for the worker found by [`find_worker_binary`].
    pub fn locate() -> Result<Self> {
        find_worker_binary().map(Self::new)
    }

    pub fn worker_path(&self) -> &Path {
        &self.worker_path
    }
}

impl UnitSpawner for ProcessSpawner {
    fn spawn(&self) -> Result<(Box<dyn ExecutionUnit>, UnitEvents)> {
        let (unit, events) = ProcessUnit::spawn(&self.worker_path)?;
        Ok((Box::new(unit), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let spawner = ProcessSpawner::new("/nonexistent/cellbook-worker");
        let err = spawner.spawn().err().unwrap();
        assert!(err.to_string().contains("Failed to spawn worker process"));
    }
}
