//! Inter-process communication with execution units.
//!
//! This module provides the unit protocol and the process-backed execution
//! unit that speaks it.

pub mod protocol;
mod worker;

pub use protocol::{
    WorkerCommand, WorkerResponse, read_message, read_message_async, write_message,
    write_message_async, write_response,
};
pub use worker::{ProcessSpawner, ProcessUnit, WORKER_PATH_ENV, find_worker_binary};
