use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn extbackup() -> Command {
    let mut cmd = Command::cargo_bin("extbackup").unwrap();
    cmd.env_remove("EXTBACKUP_CONFIG");
    cmd
}

#[test]
fn help_lists_flags() {
    extbackup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn missing_config_file_exits_1() {
    let temp = TempDir::new().unwrap();

    extbackup()
        .arg("--config")
        .arg(temp.path().join("missing.yaml"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn unparseable_config_exits_1() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "source: [oops").unwrap();

    extbackup()
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[ERROR]"));
}

#[test]
fn missing_required_fields_exit_1() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    fs::write(&config, "retention_days: 10\n").unwrap();

    extbackup()
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'source' and 'destination'"));
}

#[test]
fn config_path_from_environment() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("env.yaml");
    fs::write(&config, "destination: /mnt/usb\n").unwrap();

    extbackup()
        .env("EXTBACKUP_CONFIG", &config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("'source' and 'destination'"));
}

#[test]
fn unmounted_destination_aborts_with_exit_1() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("home");
    let destination = temp.path().join("drive");
    let logs = temp.path().join("logs");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&destination).unwrap();

    let config = temp.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "source: {}\ndestination: {}\nlog_dir: {}\n",
            source.display(),
            destination.display(),
            logs.display()
        ),
    )
    .unwrap();

    extbackup()
        .arg("--config")
        .arg(&config)
        .arg("--dry-run")
        // Keep notify-send from reaching a real desktop session
        .env("PATH", "")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not mounted"));

    // Nothing was written to the destination, and the log file exists
    assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
    let log = fs::read_to_string(logs.join("backup.log")).unwrap();
    assert!(log.contains("BACKUP STARTED"));
    assert!(log.contains("[ERROR   ]"));
}
