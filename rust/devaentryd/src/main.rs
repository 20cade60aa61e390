use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devaentryd::config::{Backend, Config};
use devaentryd::form::FormSpec;
use devaentryd::workflow::WorkflowOptions;
use devaentryd::{ipc, store, Engine};

#[derive(Parser)]
#[command(name = "devaentryd")]
#[command(about = "Student data-entry sidecar (line-delimited JSON on stdin/stdout)")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "DEVAENTRY_CONFIG", default_value = "devaentry.toml")]
    config: PathBuf,

    /// Record store backend (overrides config file)
    #[arg(long, env = "DEVAENTRY_BACKEND", value_enum)]
    backend: Option<Backend>,

    /// Workspace directory for the sqlite backend (overrides config file)
    #[arg(long, env = "DEVAENTRY_WORKSPACE")]
    workspace: Option<PathBuf>,
}

const DEFAULT_LOG: &str = "devaentryd=info";

/// `RUST_LOG` when set and parseable, `devaentryd=info` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries responses; logs go to stderr.
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    if let Some(workspace) = cli.workspace {
        config.store.workspace = Some(workspace);
    }
    config.validate()?;

    info!(
        backend = config.store.backend.as_str(),
        sessions = config.workflow.sessions,
        "starting devaentryd"
    );

    let store = store::open_store(&config.store)?;
    let engine = Engine::new(
        store,
        WorkflowOptions::from(&config.workflow),
        FormSpec::from_config(&config.form),
    );
    let mut state = ipc::AppState {
        engine,
        backend: config.store.backend.as_str().to_string(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req).await,
            Err(e) => {
                // Can't reply with an id we could not parse.
                serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                })
            }
        };

        let mut out = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, exiting");
    Ok(())
}
