//! Cellbook worker - isolated execution unit.
//!
//! Reads length-prefixed commands from stdin and answers on stdout. Logging
//! goes to stderr so it never mixes with the protocol stream. A panic inside
//! a library function takes the whole process down, which the parent sees as
//! a crash.

use std::io::{BufReader, BufWriter};

use anyhow::Context as _;
use cellbook_core::ipc::{read_message, write_response};
use cellbook_core::{Error, Interpreter, WorkerCommand, WorkerResponse};

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CELLBOOK_WORKER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let interpreter = Interpreter::builtin();
    let mut stdin = BufReader::new(std::io::stdin().lock());
    let mut stdout = BufWriter::new(std::io::stdout().lock());

    tracing::debug!("Worker {} ready", std::process::id());

    loop {
        let command: WorkerCommand = match read_message(&mut stdin) {
            Ok(command) => command,
            Err(Error::Disconnected) => {
                tracing::debug!("Parent closed stdin, exiting");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to read command"),
        };

        let response = interpreter.respond(command);
        let done = matches!(response, WorkerResponse::ShuttingDown);
        write_response(&mut stdout, &response).context("Failed to write response")?;

        if done {
            return Ok(());
        }
    }
}
