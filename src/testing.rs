//! Test doubles for the external-facing seams

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::backup::disk::{DiskProbe, DiskUsage};
use crate::error::{BackupError, BackupResult};
use crate::notify::{Notifier, Urgency};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Replays scripted results and records every command it was given
pub struct FakeRunner {
    responses: Mutex<VecDeque<BackupResult<CommandOutput>>>,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeRunner {
    pub fn new(responses: Vec<BackupResult<CommandOutput>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runner that exits with `status` for every call
    pub fn exiting(status: i32) -> Self {
        Self::new(vec![Ok(CommandOutput::with_status(status))])
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<CommandSpec>>> {
        Arc::clone(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> BackupResult<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(BackupError::launch(&spec.program, "no scripted response")),
            // The last response repeats
            1 => match responses.front().unwrap() {
                Ok(output) => Ok(output.clone()),
                Err(e) => Err(BackupError::launch(&spec.program, e)),
            },
            _ => responses.pop_front().unwrap(),
        }
    }
}

/// Collects notifications instead of delivering them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, Urgency)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, Urgency)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, urgency: Urgency) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, u)| *u == urgency)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, urgency: Urgency) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), urgency));
    }
}

/// Disk probe with fixed answers
pub struct FakeDisk {
    pub mounted: bool,
    pub usage: Option<DiskUsage>,
}

impl FakeDisk {
    /// A mounted disk of `total_gib` with `free_gib` available
    pub fn mounted_with_free(total_gib: u64, free_gib: u64) -> Self {
        Self {
            mounted: true,
            usage: Some(DiskUsage {
                total: total_gib * GIB,
                used: (total_gib - free_gib) * GIB,
                free: free_gib * GIB,
            }),
        }
    }

    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            usage: None,
        }
    }
}

impl DiskProbe for FakeDisk {
    fn is_mount_point(&self, _path: &Path) -> BackupResult<bool> {
        Ok(self.mounted)
    }

    fn usage(&self, _path: &Path) -> BackupResult<DiskUsage> {
        self.usage
            .ok_or_else(|| BackupError::Io("statvfs failed: Input/output error".into()))
    }
}
