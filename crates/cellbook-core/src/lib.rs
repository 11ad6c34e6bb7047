//! Core engine for the cellbook notebook runtime.
//!
//! This crate provides:
//! - The value model and ordered variable context
//! - The line-oriented command language parser
//! - The cell interpreter and namespace registry, with a bundled library
//! - Output classification for the rendering layer
//! - Execution units (in-process thread or isolated worker process) and
//!   their IPC protocol

pub mod error;
pub mod execute;
pub mod ipc;
mod library;
pub mod output;
pub mod parser;
pub mod registry;
pub mod value;

pub use error::{Error, Result};
pub use execute::{
    CellOutcome, ExecutionUnit, Interpreter, ThreadSpawner, UnitEvent, UnitEvents, UnitSpawner,
};
pub use ipc::{ProcessSpawner, WorkerCommand, WorkerResponse};
pub use output::{NO_OUTPUT, OutputDescriptor, OutputKind, classify};
pub use parser::{Call, Statement, parse_line};
pub use registry::{CallError, CallResult, Namespace, NativeFn, Registry};
pub use value::{Context, Object, Value};
