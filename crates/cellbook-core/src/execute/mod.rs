//! Cell execution.
//!
//! - [`Interpreter`]: runs one cell against a context snapshot
//! - [`ExecutionUnit`] / [`UnitSpawner`]: restartable runtime hosting an
//!   interpreter, with an in-process thread implementation here and a
//!   process implementation in [`crate::ipc`]

mod interpreter;
mod unit;

pub use interpreter::{CellOutcome, Interpreter};
pub use unit::{ExecutionUnit, ThreadSpawner, ThreadUnit, UnitEvent, UnitEvents, UnitSpawner};
