//! Cellbook CLI - notebook cell execution engine.

mod colors;
mod notebook;
mod output;
mod run;
mod serve;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use cellbook_server::{ServerConfig, SessionConfig, UnitKind};

#[derive(Parser)]
#[command(name = "cellbook")]
#[command(about = "Run notebook cells against a namespaced function library")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by every command that starts a session.
#[derive(Args)]
struct SessionArgs {
    /// Per-cell deadline in seconds
    #[arg(long, default_value = "30")]
    timeout: f64,

    /// Run cells on a thread in this process; hung cells are not isolated
    ///
    /// A cell that misses its deadline cannot be stopped on a thread. Its
    /// thread is abandoned and keeps running, holding its resources, until
    /// the library call returns. Use the default worker process to kill
    /// hung cells.
    #[arg(long)]
    in_process: bool,

    /// Report a crashed execution unit as an error result for its cell
    #[arg(long)]
    report_crashes: bool,
}

impl SessionArgs {
    fn config(&self) -> anyhow::Result<(SessionConfig, UnitKind)> {
        let deadline = Duration::try_from_secs_f64(self.timeout)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| anyhow::anyhow!("--timeout must be a positive number of seconds"))?;
        let config = SessionConfig {
            deadline,
            report_crashes: self.report_crashes,
            ..SessionConfig::default()
        };
        let unit = if self.in_process {
            UnitKind::Thread
        } else {
            UnitKind::Process
        };
        Ok((config, unit))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every cell of a notebook in order
    Run {
        /// Path to the notebook
        notebook: String,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Serve a session over WebSocket
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        #[command(flatten)]
        session: SessionArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            notebook,
            json,
            session,
        } => {
            let (config, unit) = session.config()?;
            run::execute(&notebook, config, unit, json).await?;
        }

        Commands::Serve {
            host,
            port,
            session,
        } => {
            let (config, unit) = session.config()?;
            serve::execute(ServerConfig { host, port }, config, unit).await?;
        }
    }

    Ok(())
}
