//! psbrowser CLI binary
//!
//! Connects to the pub/sub gateway, logs in and runs the interactive shell.
//! For library usage, see the `psbrowser` crate documentation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

use psbrowser::config::{CliOptions, default_config_path, load_config, resolve_params};
use psbrowser::router::Router;
use psbrowser::session::Session;
use psbrowser::shell::{LineEditor, Shell};
use psbrowser::transport::{Credentials, TcpTransport, Transport, authenticate};

/// Interactive shell for browsing and managing pub/sub nodes.
#[derive(Parser, Debug)]
#[command(name = "psbrowser", author, version, about)]
struct Cli {
    /// Account identity to log in as (e.g. alice@example.org).
    #[arg(short = 'j', long)]
    jid: String,
    /// Account password.
    #[arg(short = 'p', long)]
    password: String,
    /// Pub/sub service to browse (e.g. pubsub.example.org).
    #[arg(short = 's', long)]
    service: String,
    /// Gateway host to connect to.
    #[arg(short = 'a', long)]
    address: String,
    /// Optional config file (default ~/.config/psbrowser/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reply timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Log level (trace|debug|info|warn|error). RUST_LOG wins when set.
    #[arg(long)]
    log_level: Option<String>,
}

impl CliOptions for Cli {
    fn jid(&self) -> String {
        self.jid.clone()
    }
    fn password(&self) -> String {
        self.password.clone()
    }
    fn service(&self) -> String {
        self.service.clone()
    }
    fn address(&self) -> String {
        self.address.clone()
    }
    fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }
    fn log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout with success; every other
            // argument problem is a failure.
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[psbrowser] Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => load_config(&path)?,
        None => None,
    };
    let params = resolve_params(&cli, config.as_ref())?;

    // Logs go to stderr; stdout carries shell output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&params.log_level)),
        )
        .init();

    info!(
        jid = %params.jid,
        service = %params.service,
        address = %params.address,
        port = params.port,
        "psbrowser v{} starting",
        psbrowser::VERSION
    );

    let credentials = Credentials {
        jid: params.jid.clone(),
        password: params.password.clone(),
    };
    let (transport, mut events) = TcpTransport::connect(
        &params.address,
        params.port,
        &credentials,
        params.max_frame_bytes,
    )
    .await?;
    authenticate(&transport, &mut events, params.auth_timeout)
        .await
        .context("login failed")?;

    let session = Session::new(&params.jid, &params.service);
    let router = Router::new(transport, params.request_timeout);
    let mut shell = Shell::new(session, router, std::io::stdout());

    let mut editor = LineEditor::new(Some(params.history_file.clone()))?;
    let outcome = shell.run(&mut editor).await;
    editor.save_history();
    shell.router().transport().disconnect();
    outcome
}
