//! Restartable execution units.
//!
//! An execution unit runs cells on behalf of the orchestrator and reports
//! back over an event channel. Units are disposable: on timeout or crash the
//! orchestrator terminates the current one and asks its [`UnitSpawner`] for a
//! fresh unit, the same way it got the first one.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc as std_mpsc};
use std::thread;

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::ipc::{WorkerCommand, WorkerResponse};
use crate::registry::Registry;

use super::interpreter::Interpreter;

/// Something an execution unit reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    /// A protocol response.
    Response(WorkerResponse),
    /// The unit died. No further events follow.
    Crashed(String),
}

/// Receiving half of a unit's event channel.
pub type UnitEvents = mpsc::UnboundedReceiver<UnitEvent>;

/// A running execution unit.
pub trait ExecutionUnit: Send {
    /// Queue a command. Fails if the unit is already gone.
    fn dispatch(&mut self, command: WorkerCommand) -> Result<()>;

    /// Stop the unit unconditionally. Events it might still produce are
    /// never delivered.
    fn terminate(&mut self);
}

/// Factory for execution units.
pub trait UnitSpawner: Send + Sync {
    fn spawn(&self) -> Result<(Box<dyn ExecutionUnit>, UnitEvents)>;
}

/// Execution unit backed by a dedicated OS thread in this process.
///
/// A terminated thread cannot be stopped mid-call; it is detached instead and
/// exits once its current function returns.
pub struct ThreadUnit {
    commands: Option<std_mpsc::Sender<WorkerCommand>>,
    name: String,
}

impl ThreadUnit {
    pub fn spawn(interpreter: Interpreter, name: String) -> Result<(Self, UnitEvents)> {
        let (command_tx, command_rx) = std_mpsc::channel::<WorkerCommand>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_thread(interpreter, command_rx, event_tx))?;

        Ok((
            Self {
                commands: Some(command_tx),
                name,
            },
            event_rx,
        ))
    }
}

fn run_thread(
    interpreter: Interpreter,
    commands: std_mpsc::Receiver<WorkerCommand>,
    events: mpsc::UnboundedSender<UnitEvent>,
) {
    while let Ok(command) = commands.recv() {
        let shutdown = matches!(command, WorkerCommand::Shutdown);
        let event = match panic::catch_unwind(AssertUnwindSafe(|| interpreter.respond(command))) {
            Ok(response) => UnitEvent::Response(response),
            Err(payload) => {
                let _ = events.send(UnitEvent::Crashed(panic_message(payload.as_ref())));
                return;
            }
        };
        // Receiver gone means the unit was terminated.
        if events.send(event).is_err() || shutdown {
            return;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl ExecutionUnit for ThreadUnit {
    fn dispatch(&mut self, command: WorkerCommand) -> Result<()> {
        let sender = self
            .commands
            .as_ref()
            .ok_or_else(|| Error::UnitCrash(format!("{} has been terminated", self.name)))?;
        sender
            .send(command)
            .map_err(|_| Error::UnitCrash(format!("{} is no longer running", self.name)))
    }

    fn terminate(&mut self) {
        if self.commands.take().is_some() {
            tracing::debug!("Detaching execution thread {}", self.name);
        }
    }
}

/// Spawns [`ThreadUnit`]s over a shared registry.
#[derive(Debug)]
pub struct ThreadSpawner {
    interpreter: Interpreter,
    spawned: AtomicUsize,
}

impl ThreadSpawner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            interpreter: Interpreter::new(registry),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Spawner over the bundled library.
    pub fn builtin() -> Self {
        Self::new(Arc::new(Registry::builtin()))
    }
}

impl UnitSpawner for ThreadSpawner {
    fn spawn(&self) -> Result<(Box<dyn ExecutionUnit>, UnitEvents)> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let (unit, events) = ThreadUnit::spawn(self.interpreter.clone(), format!("cellbook-unit-{}", n))?;
        Ok((Box::new(unit), events))
    }
}
