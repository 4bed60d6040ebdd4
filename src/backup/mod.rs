//! Backup system for extbackup
//!
//! Mirrors a source tree onto an external drive and prunes old copies.
//!
//! # Architecture
//!
//! - `BackupOrchestrator`: sequences the run and applies the failure policy
//! - `disk`: mount and free-space verification
//! - `TransferEngine`: builds and runs the rsync invocation
//! - `RetentionManager`: removes backups older than the retention window
//! - `CancellationListener`: turns `SIGINT`/`SIGTERM` into an orderly abort
//!
//! # Backup Layout
//!
//! One directory per calendar day directly under the destination root:
//! `backup_YYYY-MM-DD`. Two runs on the same day mirror into the same
//! directory. Rotation only ever touches names of exactly that shape.
//!
//! # Example
//!
//! ```rust,ignore
//! use extbackup::backup::{BackupOrchestrator, CancellationToken, SystemDisk};
//! use extbackup::notify::DesktopNotifier;
//! use extbackup::process::SystemRunner;
//!
//! let notifier = DesktopNotifier::new();
//! let token = CancellationToken::new();
//! let runner = SystemRunner::with_cancellation(token.clone());
//! let orchestrator = BackupOrchestrator::new(&config, &runner, &SystemDisk, &notifier, token);
//! let run = orchestrator.run(false);
//! std::process::exit(run.outcome().exit_code());
//! ```

pub mod cancel;
pub mod disk;
mod orchestrator;
pub mod retention;
mod run;
pub mod transfer;

pub use cancel::{CancellationListener, CancellationToken, INTERRUPTED_EXIT_CODE};
pub use disk::{check_mount, check_space, DiskProbe, DiskUsage, SpaceVerdict, SystemDisk};
pub use orchestrator::{BackupOrchestrator, Clock};
pub use retention::{backup_dir_for, backup_dir_name, parse_backup_date, RetentionManager};
pub use run::{BackupRun, Outcome};
pub use transfer::{TransferEngine, TransferReport, TransferSummary};
