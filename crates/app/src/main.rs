//! Arbor - Main Entry Point
//!
//! Loads settings, seeds a session from a workspace fixture, replays an
//! optional drop script and prints the resulting trees.

use std::env;
use std::path::PathBuf;

use arbor::script::load_script;
use arbor::{AppError, Session, WorkspaceFixture};
use arbor_infrastructure::SettingsRepository;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ARBOR_LOG";
/// Environment variable holding the UI state directory.
const WORKSPACE_ENV: &str = "ARBOR_WORKSPACE";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replay drag-and-drop sessions against an Arbor workspace",
    long_about = None
)]
struct Cli {
    /// Workspace fixture (JSON).
    fixture: PathBuf,

    /// Drop event script (JSON array) to replay after seeding.
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Directory for persisted UI state. Overrides ARBOR_WORKSPACE.
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Settings file to use instead of the platform config directory.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings_repo = cli
        .settings
        .map_or_else(SettingsRepository::new, SettingsRepository::at);
    let mut settings = settings_repo.load().await?;
    init_logging(&settings.log_filter);

    if let Some(dir) = cli
        .workspace
        .or_else(|| env::var_os(WORKSPACE_ENV).map(PathBuf::from))
    {
        settings.workspace_dir = Some(dir);
    }
    let workspace = settings
        .workspace_dir
        .clone()
        .or_else(SettingsRepository::config_dir)
        .ok_or(AppError::NoWorkspace)?;

    let fixture = WorkspaceFixture::load(&cli.fixture).await?;
    let mut session = Session::open(fixture, &workspace, settings).await?;

    if let Some(script) = cli.script {
        let events = load_script(&script).await?;
        for step in session.replay(events).await {
            match step.outcome {
                Ok(report) => println!("#{} ok: {report:?}", step.index),
                Err(err) => println!("#{} failed: {err}", step.index),
            }
        }
    }

    print!("{}", session.render());
    session.close();
    Ok(())
}
