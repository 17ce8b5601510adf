//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`active`,
//! `use`, `hosts`, `keys`, `doctor`). It serves as the coordination layer,
//! interacting with:
//! - `crate::config_file` to load and save the SSH config.
//! - `crate::keys` for key path expansion and discovery.
//! - `crate::ui` for user interaction (output, prompts).
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail, ensure};
use inquire::Select;
use serde::Serialize;

use crate::activate::Activation;
use crate::config_file::{ConfigFile, SaveOutcome, parse_config};
use crate::doctor::run_doctor;
use crate::document::IDENTITY_FILE;
use crate::keys::{contract_home, discover_keys, key_exists, same_key};
use crate::paths::Paths;
use crate::ui::Ui;

/// JSON shape of `sshid active --json`
#[derive(Debug, Serialize)]
struct ActiveReport<'a> {
    host: &'a str,
    identity_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matched_host: Option<Vec<String>>,
    key_exists: bool,
}

/// JSON shape of one entry in `sshid hosts --json`
#[derive(Debug, Serialize)]
struct HostSummary {
    patterns: Vec<String>,
    identity_file: Option<String>,
    key_exists: Option<bool>,
}

fn load(paths: &Paths) -> Result<ConfigFile> {
    parse_config(&paths.ssh_config)
        .with_context(|| format!("Failed to load SSH config: {:?}", paths.ssh_config))
}

fn active_report<'a>(paths: &Paths, config: &ConfigFile, host: &'a str) -> ActiveReport<'a> {
    let resolution = config.document().resolve_identity(host);
    ActiveReport {
        host,
        key_exists: resolution
            .as_ref()
            .is_some_and(|r| key_exists(&r.identity_file, &paths.home)),
        identity_file: resolution.as_ref().map(|r| r.identity_file.clone()),
        matched_host: resolution.map(|r| r.patterns),
    }
}

fn host_summaries(paths: &Paths, config: &ConfigFile) -> Vec<HostSummary> {
    config
        .document()
        .host_blocks()
        .map(|block| {
            let identity_file = block.directive_value(IDENTITY_FILE).map(String::from);
            HostSummary {
                patterns: block.patterns().into_iter().map(String::from).collect(),
                key_exists: identity_file.as_deref().map(|k| key_exists(k, &paths.home)),
                identity_file,
            }
        })
        .collect()
}

/// Host blocks whose IdentityFile points at `key`, as space-joined patterns
fn key_users(paths: &Paths, config: &ConfigFile, key: &str) -> Vec<String> {
    config
        .document()
        .host_blocks()
        .filter(|block| {
            block
                .directive_value(IDENTITY_FILE)
                .is_some_and(|value| same_key(value, key, &paths.home))
        })
        .map(|block| block.patterns().join(" "))
        .collect()
}

/// Show the identity file ssh would use for a host
pub fn active(paths: &Paths, host: &str, json: bool, ui: &Ui) -> Result<()> {
    let config = load(paths)?;

    if json {
        let report = active_report(paths, &config, host);
        ui.println(serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
        return Ok(());
    }

    match config.document().resolve_identity(host) {
        Some(resolution) => {
            ui.println(&resolution.identity_file);
            if !key_exists(&resolution.identity_file, &paths.home) {
                ui.warn(format!(
                    "Key file does not exist: {}",
                    paths.expand(&resolution.identity_file).display()
                ));
            }
        }
        // Empty line keeps `$(sshid active host)` usable in scripts
        None => ui.println(""),
    }
    Ok(())
}

/// Make `key` the identity file for `host`, prompting for a key if none is given
pub fn use_key(
    paths: &Paths,
    host: &str,
    key: Option<String>,
    no_verify: bool,
    ui: &Ui,
) -> Result<()> {
    let mut config = load(paths)?;

    let key = match key {
        Some(key) => key,
        None => select_key(paths, host, &config)?,
    };

    if !no_verify && !key_exists(&key, &paths.home) {
        bail!(
            "SSH key file not found: {}\nHint: Pass --no-verify to configure a key that does not exist yet.",
            paths.expand(&key).display()
        );
    }

    let spinner = ui.spinner(format!("Activating {} for {}...", key, host));

    match activate_and_save(paths, &mut config, host, &key) {
        Ok((activation, outcome)) => {
            let message = match &activation {
                Activation::Inserted => format!("Added Host {} → {}", host, key),
                Activation::Updated { previous: Some(previous) } => {
                    format!("Switched {}: {} → {}", host, previous, key)
                }
                Activation::Updated { previous: None } => format!("Host {} → {}", host, key),
                Activation::Unchanged => format!("{} already uses {}", host, key),
            };
            ui.spinner_finish_ok(&spinner, message);

            match outcome {
                SaveOutcome::Created => ui.info(format!("Created {}", config.path().display())),
                SaveOutcome::Updated { backup } => {
                    ui.info(format!("Previous config saved to {}", backup.display()))
                }
                SaveOutcome::Unchanged => {}
            }
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to activate key: {}", e));
            Err(e)
        }
    }
}

fn activate_and_save(
    paths: &Paths,
    config: &mut ConfigFile,
    host: &str,
    key: &str,
) -> Result<(Activation, SaveOutcome)> {
    let activation = config.document_mut().activate_key(host, key)?;

    let active = config.document().active_identity_file(host);
    ensure!(
        active.as_deref().is_some_and(|a| same_key(a, key, &paths.home)),
        "Refusing to save: {} would still resolve to {:?}",
        host,
        active
    );

    let outcome = config.save()?;
    Ok((activation, outcome))
}

/// Interactive key selection from the keys found in ~/.ssh
fn select_key(paths: &Paths, host: &str, config: &ConfigFile) -> Result<String> {
    let keys = discover_keys(&paths.ssh_dir)?;
    if keys.is_empty() {
        bail!(
            "No key pairs found in {}\nHint: Pass the key path explicitly: sshid use {} <key>",
            paths.ssh_dir.display(),
            host
        );
    }

    let options: Vec<String> = keys.iter().map(|k| contract_home(k, &paths.home)).collect();
    let current = config.document().active_identity_file(host);
    let default = current
        .as_deref()
        .and_then(|c| options.iter().position(|o| same_key(o, c, &paths.home)))
        .unwrap_or(0);

    Select::new(&format!("Which key should {} use?", host), options)
        .with_starting_cursor(default)
        .with_help_message("↑↓ to move, Enter to select")
        .prompt()
        .context("Key selection cancelled")
}

/// List Host blocks and the identity file each one sets
pub fn hosts(paths: &Paths, json: bool, ui: &Ui) -> Result<()> {
    let config = load(paths)?;
    let summaries = host_summaries(paths, &config);

    if json {
        ui.println(serde_json::to_string_pretty(&summaries).context("Failed to serialize hosts")?);
        return Ok(());
    }

    if summaries.is_empty() {
        ui.warn(format!("No Host blocks in {}", config.path().display()));
        ui.newline();
        ui.println("Add one with:");
        ui.println(format!("  {} use <host> <key>", ui.bold("sshid")));
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Host"),
        ui.header_cell("IdentityFile"),
        ui.header_cell("Status"),
    ]);

    for summary in &summaries {
        let status = match summary.key_exists {
            Some(true) => ui.colored_cell("ok", AnsiColor::Green),
            Some(false) => ui.colored_cell("missing", AnsiColor::Red),
            None => ui.cell("-"),
        };
        table.add_row(vec![
            ui.cell(summary.patterns.join(" ")),
            ui.cell(summary.identity_file.as_deref().unwrap_or("")),
            status,
        ]);
    }

    ui.section(format!("Hosts in {}", config.path().display()));
    ui.println(table.to_string());
    Ok(())
}

/// List key pairs in ~/.ssh and which hosts use them
pub fn keys(paths: &Paths, ui: &Ui) -> Result<()> {
    let keys = discover_keys(&paths.ssh_dir)?;
    if keys.is_empty() {
        ui.warn(format!("No key pairs found in {}", paths.ssh_dir.display()));
        return Ok(());
    }

    let config = load(paths)?;

    let mut table = ui.simple_table();
    table.set_header(vec![ui.header_cell(""), ui.header_cell("Key"), ui.header_cell("Used by")]);

    for key in &keys {
        let display = contract_home(key, &paths.home);
        let users = key_users(paths, &config, &display);

        let (icon, used_by) = if users.is_empty() {
            (" ", ui.dim("-"))
        } else {
            (ui.icon_ok(), users.join(", "))
        };
        table.add_row(vec![ui.cell(icon), ui.cell(display), ui.cell(used_by)]);
    }

    ui.section("Keys");
    ui.println(table.to_string());
    Ok(())
}

/// Run diagnostics
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    run_doctor(paths, ui);
    Ok(())
}
