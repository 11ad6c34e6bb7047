//! Notebook session management.
//!
//! A session owns the authoritative variable context and exactly one
//! execution unit. Requests are serialized through a FIFO queue and run one
//! at a time under a deadline. A unit that misses the deadline or crashes is
//! terminated and replaced; the context is only ever replaced wholesale by a
//! successful result.
//!
//! The orchestrator runs as a single tokio task. [`SessionHandle`] is the
//! cloneable front end that feeds it. Every subscriber gets its own unbounded
//! channel, so a slow reader delays its own messages but never loses any.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use cellbook_core::{
    Context, Error, ExecutionUnit, OutputDescriptor, ProcessSpawner, ThreadSpawner, UnitEvent,
    UnitEvents, UnitSpawner, WorkerCommand, WorkerResponse,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::autosave::AutoSaver;
use crate::error::{ServerError, ServerResult};
use crate::protocol::{CellSource, ClientMessage, ServerMessage};

/// Default per-cell execution deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Default auto-save quiet period.
pub const DEFAULT_AUTOSAVE_QUIET: Duration = Duration::from_secs(2);

/// Which execution unit implementation a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitKind {
    /// Dedicated thread in this process.
    Thread,
    /// Isolated `cellbook-worker` child process.
    #[default]
    Process,
}

impl UnitKind {
    /// Spawner for the bundled library.
    pub fn spawner(self) -> ServerResult<Arc<dyn UnitSpawner>> {
        Ok(match self {
            UnitKind::Thread => Arc::new(ThreadSpawner::builtin()),
            UnitKind::Process => Arc::new(ProcessSpawner::locate()?),
        })
    }
}

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wall-clock budget per cell. Exceeding it replaces the unit.
    pub deadline: Duration,
    /// Emit an error result for a cell whose unit crashed. Off by default: the
    /// crashed cell then gets no result at all.
    pub report_crashes: bool,
    /// Quiet period before an auto-save request.
    pub autosave_quiet: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            report_crashes: false,
            autosave_quiet: DEFAULT_AUTOSAVE_QUIET,
        }
    }
}

enum SessionCommand {
    Execute(CellSource),
    ExecuteAll(Vec<CellSource>),
    Subscribe(mpsc::UnboundedSender<ServerMessage>),
}

/// Cloneable handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    autosave: AutoSaver,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCommand::Execute(cell) => write!(f, "Execute({})", cell.id),
            SessionCommand::ExecuteAll(cells) => write!(f, "ExecuteAll({} cells)", cells.len()),
            SessionCommand::Subscribe(_) => f.write_str("Subscribe"),
        }
    }
}

impl SessionHandle {
    /// Start a session: spawn the first execution unit, the orchestrator task
    /// and the auto-saver. Must be called from within a tokio runtime.
    pub fn start(config: SessionConfig, spawner: Arc<dyn UnitSpawner>) -> ServerResult<Self> {
        let (unit, unit_events) = spawner.spawn()?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let autosave = AutoSaver::spawn(config.autosave_quiet, notice_tx);

        let orchestrator = Orchestrator {
            config,
            spawner,
            unit: Some(unit),
            unit_events: Some(unit_events),
            context: Context::new(),
            queue: VecDeque::new(),
            in_flight: None,
            epoch: 0,
            subscribers: Vec::new(),
        };
        tokio::spawn(orchestrator.run(command_rx, notices));

        Ok(Self { commands, autosave })
    }

    /// Subscribe to session messages.
    ///
    /// The subscription is ordered with the requests sent through this
    /// handle: results of anything queued after this call are delivered.
    /// The receiver ends once the session stops.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.send(SessionCommand::Subscribe(tx)).is_err() {
            tracing::debug!("Subscribed to a closed session");
        }
        rx
    }

    /// Queue one cell.
    pub fn execute_cell(&self, cell_id: impl Into<String>, source: impl Into<String>) -> ServerResult<()> {
        self.send(SessionCommand::Execute(CellSource::new(cell_id, source)))
    }

    /// Reset the context and run `cells` in order, replacing anything queued.
    pub fn execute_all(&self, cells: Vec<CellSource>) -> ServerResult<()> {
        self.send(SessionCommand::ExecuteAll(cells))
    }

    /// Record a notebook edit for auto-save.
    pub fn notify_edit(&self) {
        self.autosave.edited();
    }

    /// Acknowledge the outstanding auto-save.
    pub fn auto_save_done(&self) {
        self.autosave.done();
    }

    /// Route a host message.
    pub fn handle(&self, msg: ClientMessage) -> ServerResult<()> {
        match msg {
            ClientMessage::ExecuteCell { cell_id, source } => self.execute_cell(cell_id, source),
            ClientMessage::ExecuteAll { cells } => self.execute_all(cells),
            ClientMessage::CellEdited => {
                self.notify_edit();
                Ok(())
            }
            ClientMessage::AutoSaveDone => {
                self.auto_save_done();
                Ok(())
            }
        }
    }

    fn send(&self, command: SessionCommand) -> ServerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ServerError::SessionClosed)
    }
}

/// The cell currently running on the unit.
struct InFlight {
    cell_id: String,
    deadline: Instant,
    /// Run-all generation the request was dispatched under.
    epoch: u64,
}

struct Orchestrator {
    config: SessionConfig,
    spawner: Arc<dyn UnitSpawner>,
    unit: Option<Box<dyn ExecutionUnit>>,
    unit_events: Option<UnitEvents>,
    context: Context,
    queue: VecDeque<CellSource>,
    in_flight: Option<InFlight>,
    /// Bumped by every run-all so results dispatched before the reset do
    /// not overwrite the fresh context.
    epoch: u64,
    subscribers: Vec<mpsc::UnboundedSender<ServerMessage>>,
}

impl Orchestrator {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut notices: mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        loop {
            let deadline = self.in_flight.as_ref().map(|f| f.deadline);
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(notice) = notices.recv() => self.publish(notice),
                event = next_event(&mut self.unit_events) => self.on_unit_event(event),
                _ = sleep_until_opt(deadline) => self.on_deadline(),
            }
        }

        tracing::debug!("Session closed, stopping execution unit");
        self.retire_unit();
    }

    fn on_command(&mut self, command: SessionCommand) {
        tracing::debug!("Session command: {:?}", command);
        match command {
            SessionCommand::Subscribe(tx) => {
                self.subscribers.push(tx);
                return;
            }
            SessionCommand::Execute(cell) => self.queue.push_back(cell),
            SessionCommand::ExecuteAll(cells) => {
                self.epoch += 1;
                self.context = Context::new();
                self.queue = cells.into();
            }
        }
        self.pump();
    }

    fn on_unit_event(&mut self, event: Option<UnitEvent>) {
        match event {
            Some(UnitEvent::Response(response)) => self.on_response(response),
            Some(UnitEvent::Crashed(reason)) => self.on_crash(reason),
            None => self.on_crash("execution unit event channel closed".to_string()),
        }
    }

    fn on_response(&mut self, response: WorkerResponse) {
        if matches!(response, WorkerResponse::Pong | WorkerResponse::ShuttingDown) {
            tracing::debug!("Execution unit: {:?}", response);
            return;
        }

        let in_flight = match self.in_flight.take() {
            Some(f) if response.cell_id() == Some(f.cell_id.as_str()) => f,
            other => {
                self.in_flight = other;
                tracing::warn!(
                    "Ignoring response for cell {:?}, not in flight",
                    response.cell_id()
                );
                return;
            }
        };

        match response {
            WorkerResponse::Result {
                cell_id,
                output,
                context,
            } => {
                if in_flight.epoch == self.epoch {
                    self.context = context;
                } else {
                    tracing::debug!("Cell {} finished after run-all reset, context discarded", cell_id);
                }
                self.emit(cell_id, output);
            }
            WorkerResponse::Error { cell_id, message } => {
                self.emit(cell_id, OutputDescriptor::error(message));
            }
            WorkerResponse::Pong | WorkerResponse::ShuttingDown => {}
        }
        self.pump();
    }

    fn on_crash(&mut self, reason: String) {
        tracing::warn!("Execution unit crashed: {}", reason);
        if let Some(in_flight) = self.in_flight.take() {
            if self.config.report_crashes {
                let message = Error::UnitCrash(reason).to_string();
                self.emit(in_flight.cell_id, OutputDescriptor::error(message));
            } else {
                tracing::debug!("Dropping result for crashed cell {}", in_flight.cell_id);
            }
        }
        self.respawn();
        self.pump();
    }

    fn on_deadline(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        tracing::warn!(
            "Cell {} exceeded {:?}, replacing execution unit",
            in_flight.cell_id,
            self.config.deadline
        );
        self.respawn();

        let message = Error::Timeout(describe_deadline(self.config.deadline)).to_string();
        let timing_ms = self.config.deadline.as_millis() as u64;
        self.emit(
            in_flight.cell_id,
            OutputDescriptor::error(message).with_timing(timing_ms),
        );
        self.pump();
    }

    /// Dispatch queued cells until one is in flight or the queue is empty.
    fn pump(&mut self) {
        while self.in_flight.is_none() {
            let Some(cell) = self.queue.pop_front() else {
                return;
            };
            if self.unit.is_none() {
                self.respawn();
            }

            let command = WorkerCommand::Execute {
                cell_id: cell.id.clone(),
                code: cell.source,
                context: self.context.clone(),
            };
            let dispatched = match self.unit.as_mut() {
                Some(unit) => unit.dispatch(command),
                None => Err(Error::UnitCrash("no execution unit available".to_string())),
            };

            match dispatched {
                Ok(()) => {
                    tracing::debug!("Dispatched cell {}", cell.id);
                    self.in_flight = Some(InFlight {
                        cell_id: cell.id,
                        deadline: Instant::now() + self.config.deadline,
                        epoch: self.epoch,
                    });
                }
                Err(e) => {
                    tracing::error!("Could not dispatch cell {}: {}", cell.id, e);
                    // An oversized request never reached the unit.
                    if !matches!(e, Error::FrameTooLarge(_)) {
                        self.retire_unit();
                    }
                    self.emit(cell.id, OutputDescriptor::error(e.to_string()));
                }
            }
        }
    }

    fn respawn(&mut self) {
        self.retire_unit();
        match self.spawner.spawn() {
            Ok((unit, events)) => {
                self.unit = Some(unit);
                self.unit_events = Some(events);
            }
            Err(e) => tracing::error!("Failed to spawn execution unit: {}", e),
        }
    }

    fn retire_unit(&mut self) {
        if let Some(mut unit) = self.unit.take() {
            unit.terminate();
        }
        self.unit_events = None;
    }

    fn emit(&mut self, cell_id: String, output: OutputDescriptor) {
        self.publish(ServerMessage::CellResult { cell_id, output });
    }

    /// Deliver to every live subscriber, forgetting those that hung up.
    fn publish(&mut self, msg: ServerMessage) {
        self.subscribers.retain(|tx| tx.send(msg.clone()).is_ok());
    }
}

async fn next_event(events: &mut Option<UnitEvents>) -> Option<UnitEvent> {
    match events {
        Some(events) => events.recv().await,
        None => pending().await,
    }
}

/// Sleep until `deadline`, or forever if there is none.
pub(crate) async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// "30 seconds", "1 second", "250 ms".
fn describe_deadline(deadline: Duration) -> String {
    let ms = deadline.as_millis();
    match (ms % 1000, ms / 1000) {
        (0, 1) => "1 second".to_string(),
        (0, secs) => format!("{} seconds", secs),
        _ => format!("{} ms", ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.deadline, Duration::from_secs(30));
        assert!(!config.report_crashes);
        assert_eq!(config.autosave_quiet, Duration::from_secs(2));
        assert_eq!(UnitKind::default(), UnitKind::Process);
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            Error::Timeout(describe_deadline(DEFAULT_DEADLINE)).to_string(),
            "Execution timed out (30 seconds)"
        );
        assert_eq!(describe_deadline(Duration::from_secs(1)), "1 second");
        assert_eq!(describe_deadline(Duration::from_millis(250)), "250 ms");
    }

    #[tokio::test]
    async fn test_closed_session_rejects_requests() {
        let handle = SessionHandle::start(SessionConfig::default(), Arc::new(ThreadSpawner::builtin()))
            .unwrap();
        let (closed_tx, _) = mpsc::unbounded_channel();
        let closed = SessionHandle {
            commands: closed_tx,
            ..handle
        };
        assert!(matches!(
            closed.execute_cell("a", "1"),
            Err(ServerError::SessionClosed)
        ));
    }
}
