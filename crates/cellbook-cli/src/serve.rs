//! Serve command implementation for the cellbook CLI.
//!
//! Starts the WebSocket bridge a host application drives.

use cellbook_server::{ServerConfig, SessionConfig, UnitKind};

use crate::colors;

/// Start the session server.
pub async fn execute(config: ServerConfig, session: SessionConfig, unit: UnitKind) -> anyhow::Result<()> {
    let spawner = unit.spawner()?;

    println!(
        "\n{}Cellbook Server{} - Notebook Execution Engine",
        colors::BOLD,
        colors::RESET
    );
    println!("{}", "─".repeat(50));
    println!(
        "{}  ◆ WebSocket:{} ws://{}:{}/ws",
        colors::CYAN,
        colors::RESET,
        config.host,
        config.port
    );
    println!(
        "{}  ◆ Units:{} {:?}, {}s deadline",
        colors::CYAN,
        colors::RESET,
        unit,
        session.deadline.as_secs_f64()
    );
    println!("{}", "─".repeat(50));
    println!("{}Press Ctrl+C to stop{}", colors::GREEN, colors::RESET);
    println!();

    cellbook_server::serve(config, session, spawner).await?;

    Ok(())
}
