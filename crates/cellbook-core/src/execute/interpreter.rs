//! Cell interpreter.
//!
//! Runs a cell line by line against a private copy of the context. Each line
//! is parsed only when reached, so arguments see bindings made by earlier
//! lines of the same cell.

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::ipc::{WorkerCommand, WorkerResponse};
use crate::output::{NO_OUTPUT, OutputDescriptor, classify};
use crate::parser::{Item, Statement, parse_items, parse_line, parse_value};
use crate::registry::Registry;
use crate::value::{Context, Value};

/// Successful result of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    pub output: OutputDescriptor,
    pub context: Context,
}

/// A `display(...)` request collected while running a cell.
struct DisplayRequest {
    value: Value,
    hint: Option<String>,
}

/// Executes cells against a shared registry.
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: Arc<Registry>,
}

impl Interpreter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Interpreter over the bundled library.
    pub fn builtin() -> Self {
        Self::new(Arc::new(Registry::builtin()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Execute `source` starting from `initial`.
    ///
    /// The first failing line aborts the cell; `initial` is never touched.
    pub fn execute(&self, source: &str, initial: &Context) -> Result<CellOutcome> {
        let started = Instant::now();
        let mut context = initial.clone();
        let mut last_result: Option<Value> = None;
        let mut displays: Vec<DisplayRequest> = Vec::new();

        for line in source.lines() {
            match parse_line(line, &context) {
                Statement::Skip => {}
                Statement::Display { args } => displays.push(display_request(&args, &context)),
                Statement::Assign { var, call } => {
                    let value = self.registry.call(&call.namespace, &call.function, &call.args)?;
                    context.set(var, value.clone());
                    last_result = Some(value);
                }
                Statement::Call(call) => {
                    let value = self.registry.call(&call.namespace, &call.function, &call.args)?;
                    last_result = Some(value);
                }
                Statement::AssignLiteral { var, expr } => {
                    let value = parse_value(&expr, &context);
                    context.set(var, value.clone());
                    last_result = Some(value);
                }
                Statement::Expression(text) => {
                    if let Some(value) = context.get(&text) {
                        last_result = Some(value.clone());
                    }
                }
            }
        }

        let output = match (displays.pop(), last_result) {
            (Some(shown), _) => classify(shown.value, shown.hint.as_deref()),
            (None, Some(value)) => classify(value, None),
            (None, None) => OutputDescriptor::text(NO_OUTPUT),
        };
        let timing_ms = started.elapsed().as_millis() as u64;

        Ok(CellOutcome {
            output: output.with_timing(timing_ms),
            context,
        })
    }

    /// Answer one unit-protocol command.
    pub fn respond(&self, command: WorkerCommand) -> WorkerResponse {
        match command {
            WorkerCommand::Execute {
                cell_id,
                code,
                context,
            } => match self.execute(&code, &context) {
                Ok(outcome) => WorkerResponse::Result {
                    cell_id,
                    output: outcome.output,
                    context: outcome.context,
                },
                Err(e) => {
                    tracing::debug!("Cell {} failed: {}", cell_id, e);
                    WorkerResponse::Error {
                        cell_id,
                        message: e.to_string(),
                    }
                }
            },
            WorkerCommand::Ping => WorkerResponse::Pong,
            WorkerCommand::Shutdown => WorkerResponse::ShuttingDown,
        }
    }
}

/// Evaluate `display` arguments: a value and an optional kind hint.
///
/// An unbound bare identifier in value position displays as null rather than
/// as its own name.
fn display_request(args: &str, context: &Context) -> DisplayRequest {
    let mut items = parse_items(args, context).into_iter();
    let value = match items.next() {
        Some(Item::Unbound(_)) | None => Value::Null,
        Some(item) => item.into_value(),
    };
    let hint = items
        .next()
        .map(Item::into_value)
        .and_then(|hint| match hint {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        });
    DisplayRequest { value, hint }
}
