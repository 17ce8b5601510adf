//! Diagnostic tool for sshid.
//!
//! This module implements the `sshid doctor` command, which checks the system
//! for common issues:
//! - Existence and permissions of the SSH directory and config file.
//! - Whether the config parses into Host blocks.
//! - Identity files that are referenced but missing.
//! - The backup left by the last save.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;

use crate::config_file::{ConfigFile, parse_config};
use crate::document::{Entry, IDENTITY_FILE};
use crate::error::Result;
use crate::keys::key_exists;
use crate::paths::Paths;
use crate::ui::Ui;

/// Run the doctor diagnostics. Returns whether every check passed.
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("sshid Doctor");
    ui.newline();

    let config = parse_config(&paths.ssh_config);
    let results = [
        check_step(ui, "SSH Directory", || check_ssh_dir(ui, paths)),
        check_step(ui, "Config File", || check_config_file(ui, paths, &config)),
        check_step(ui, "Identity Files", || match &config {
            Ok(config) => check_identity_files(ui, paths, config),
            Err(_) => {
                ui.println(format!("  {} Skipped (config unreadable)", ui.icon_info()));
                true
            }
        }),
        check_step(ui, "Backup", || check_backup(ui, paths)),
    ];
    results.iter().all(|passed| *passed)
}

fn check_ssh_dir(ui: &Ui, paths: &Paths) -> bool {
    if !paths.ssh_dir.is_dir() {
        ui.println(format!(
            "  {} SSH directory missing: {}",
            ui.icon_warn(),
            paths.ssh_dir.display()
        ));
        return true;
    }
    ui.println(format!(
        "  {} SSH directory exists: {}",
        ui.icon_ok(),
        paths.ssh_dir.display()
    ));
    check_not_writable_by_others(ui, &paths.ssh_dir)
}

fn check_config_file(ui: &Ui, paths: &Paths, config: &Result<ConfigFile>) -> bool {
    match config {
        Ok(config) if !config.existed() => {
            ui.println(format!(
                "  {} Config file missing (created on first 'sshid use'): {}",
                ui.icon_warn(),
                paths.ssh_config.display()
            ));
            true
        }
        Ok(config) => {
            ui.println(format!(
                "  {} Config file readable: {}",
                ui.icon_ok(),
                paths.ssh_config.display()
            ));
            let document = config.document();
            let opaque = document
                .entries()
                .iter()
                .filter(|e| matches!(e, Entry::Opaque(_)))
                .count();
            ui.println(format!(
                "  {} {} Host block(s), {} line(s) outside Host blocks",
                ui.icon_info(),
                document.host_blocks().count(),
                opaque
            ));
            check_not_writable_by_others(ui, &paths.ssh_config)
        }
        Err(e) => {
            ui.println(format!("  {} Config file unreadable: {}", ui.icon_err(), e));
            false
        }
    }
}

/// Fails when a Host block points at an identity file that does not exist
fn check_identity_files(ui: &Ui, paths: &Paths, config: &ConfigFile) -> bool {
    let mut all_present = true;
    let mut seen = 0;
    for block in config.document().host_blocks() {
        let Some(identity) = block.directive_value(IDENTITY_FILE) else {
            continue;
        };
        seen += 1;
        let hosts = block.patterns().join(" ");
        if key_exists(identity, &paths.home) {
            ui.println(format!("    {} {} → {}", ui.icon_ok(), hosts, identity));
        } else {
            ui.println(format!(
                "    {} {} → {} (file not found)",
                ui.icon_err(),
                hosts,
                identity
            ));
            all_present = false;
        }
    }
    if seen == 0 {
        ui.println(format!("  {} No IdentityFile directives in Host blocks", ui.icon_info()));
    }
    all_present
}

fn check_backup(ui: &Ui, paths: &Paths) -> bool {
    let backup = paths.ssh_config_backup();
    match fs::metadata(&backup).and_then(|m| m.modified()) {
        Ok(modified) => {
            let modified: DateTime<Local> = modified.into();
            ui.println(format!(
                "  {} Backup from {}: {}",
                ui.icon_ok(),
                modified.format("%Y-%m-%d %H:%M:%S"),
                backup.display()
            ));
        }
        Err(_) => ui.println(format!(
            "  {} No backup yet (written on the next change)",
            ui.icon_info()
        )),
    }
    true
}

#[cfg(unix)]
fn check_not_writable_by_others(ui: &Ui, path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let Ok(meta) = fs::metadata(path) else {
        return true;
    };
    let mode = meta.permissions().mode() & 0o777;
    if mode & 0o022 != 0 {
        // ssh refuses configs writable by group or others
        ui.println(format!(
            "  {} {} has mode {:o}; ssh expects it not writable by group/others",
            ui.icon_err(),
            path.display(),
            mode
        ));
        false
    } else {
        ui.println(format!("  {} Permissions {:o}", ui.icon_ok(), mode));
        true
    }
}

#[cfg(not(unix))]
fn check_not_writable_by_others(_ui: &Ui, _path: &Path) -> bool {
    true
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let passed = check_fn();
    if !passed {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    passed
}
