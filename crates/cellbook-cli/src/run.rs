//! Run command implementation for the cellbook CLI.
//!
//! Executes every cell of a notebook headlessly through "run all" and prints
//! each result as it arrives.

use std::path::Path;
use std::time::{Duration, Instant};

use cellbook_core::OutputDescriptor;
use cellbook_server::{CellSource, ServerMessage, SessionConfig, SessionHandle, UnitKind};

use crate::colors;
use crate::notebook;
use crate::output::print_output;

/// Extra wait on top of the cell deadline before giving up on a result.
const RESULT_GRACE: Duration = Duration::from_secs(5);

/// Execute a notebook.
pub async fn execute(
    notebook_path: &str,
    config: SessionConfig,
    unit: UnitKind,
    json: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let path = Path::new(notebook_path);
    let cells = notebook::load(path)?;

    if !json {
        println!(
            "\n{}Cellbook{} - Running {}",
            colors::BOLD,
            colors::RESET,
            path.display()
        );
        println!("{}", "─".repeat(50));
    }

    if cells.is_empty() {
        if !json {
            println!("{}No cells found in notebook.{}", colors::YELLOW, colors::RESET);
            println!("Cells are separated by lines starting with %%");
        }
        return Ok(());
    }

    let wait = config.deadline + RESULT_GRACE;
    let session = SessionHandle::start(config, unit.spawner()?)?;
    let mut rx = session.subscribe();
    session.execute_all(cells.clone())?;

    let mut report = Report::new(json);
    let mut next = 0;
    while next < cells.len() {
        let msg = match tokio::time::timeout(wait, rx.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => anyhow::bail!("Session closed unexpectedly"),
            // Only a silently crashed cell leaves nothing to wait for.
            Err(_) => break,
        };
        let ServerMessage::CellResult { cell_id, output } = msg else {
            continue;
        };
        let Some(offset) = cells[next..].iter().position(|cell| cell.id == cell_id) else {
            tracing::warn!("Result for unexpected cell {}", cell_id);
            continue;
        };

        // Earlier cells never reported: their unit crashed.
        for skipped in &cells[next..next + offset] {
            report.missing(skipped);
        }
        report.result(&cell_id, &output);
        next += offset + 1;
    }
    for skipped in &cells[next..] {
        report.missing(skipped);
    }

    report.finish(cells.len(), start.elapsed())
}

/// Tally and print results.
struct Report {
    json: bool,
    failed: usize,
}

impl Report {
    fn new(json: bool) -> Self {
        Self { json, failed: 0 }
    }

    fn result(&mut self, cell_id: &str, output: &OutputDescriptor) {
        if output.is_error() {
            self.failed += 1;
        }
        if self.json {
            let msg = ServerMessage::CellResult {
                cell_id: cell_id.to_string(),
                output: output.clone(),
            };
            match serde_json::to_string(&msg) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to encode result for {}: {}", cell_id, e),
            }
        } else {
            print_output(cell_id, output);
        }
    }

    fn missing(&mut self, cell: &CellSource) {
        self.failed += 1;
        if self.json {
            tracing::warn!("No result for cell {}", cell.id);
        } else {
            println!(
                "\n{}{}:{} {}no result (execution unit crashed){}",
                colors::YELLOW,
                cell.id,
                colors::RESET,
                colors::DIM,
                colors::RESET
            );
        }
    }

    fn finish(self, total: usize, elapsed: Duration) -> anyhow::Result<()> {
        if !self.json {
            println!("\n{}", "─".repeat(50));
            let (color, label) = if self.failed == 0 {
                (colors::GREEN, "Completed")
            } else {
                (colors::RED, "Finished")
            };
            println!(
                "{}{}{} {} cells in {:.2}s",
                color,
                label,
                colors::RESET,
                total,
                elapsed.as_secs_f64()
            );
        }

        if self.failed > 0 {
            anyhow::bail!("{} of {} cells failed", self.failed, total);
        }
        Ok(())
    }
}
