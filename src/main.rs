use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

use extbackup::backup::{
    BackupOrchestrator, CancellationListener, CancellationToken, SystemDisk, INTERRUPTED_EXIT_CODE,
};
use extbackup::config::{paths::CONFIG_ENV_VAR, BackupConfig, ConfigPaths};
use extbackup::logging;
use extbackup::notify::{DesktopNotifier, Notifier};
use extbackup::process::SystemRunner;

#[derive(Parser)]
#[command(
    name = "extbackup",
    version,
    about = "Incremental backup of a directory tree to an external drive",
    long_about = "extbackup mirrors a source directory into a dated folder on an \
                  external drive with rsync, after checking the drive is mounted and \
                  has enough free space, then removes backups older than the \
                  retention window.",
    after_help = "Examples:\n  \
                  extbackup                         # Normal backup\n  \
                  extbackup --dry-run               # Simulate without copying\n  \
                  extbackup --verbose               # Detailed output\n  \
                  extbackup --config other.yaml     # Custom configuration"
)]
struct Cli {
    /// Simulate the backup without copying or deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Path to the YAML configuration file
    #[arg(long, env = CONFIG_ENV_VAR, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show DEBUG messages on the terminal
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            1
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = ConfigPaths::new()?.resolve(cli.config.as_deref());
    let config = BackupConfig::load(&config_path)?;
    config.validate()?;

    let log_file = logging::init(&config.log_dir_path(), cli.verbose)?;
    debug!("Configuration: {}", config_path.display());
    debug!("Log file: {}", log_file.display());

    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new());
    let token = CancellationToken::new();

    let listener = match CancellationListener::new(token.clone(), Arc::clone(&notifier)).install() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("{}", e);
            None
        }
    };

    let runner = SystemRunner::with_cancellation(token.clone());
    let run = BackupOrchestrator::new(
        &config,
        &runner,
        &SystemDisk,
        notifier.as_ref(),
        token.clone(),
    )
    .run(cli.dry_run);

    if token.is_cancelled() {
        // The listener owns the exit once it has flipped the token; wait
        // for it to finish notifying instead of racing it to exit.
        if let Some(handle) = listener {
            let _ = handle.join();
        }
        return Ok(INTERRUPTED_EXIT_CODE);
    }

    Ok(run.outcome().exit_code())
}
