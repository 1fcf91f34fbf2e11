// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI entry point for hid-modifier-manager
//!
//! Provides command-line interface for printing current remappings,
//! setting new ones, and listing accepted key names.

use clap::{Parser, Subcommand};
use colored::*;
use hid_modifier_manager::config::settings::{resolve_helper, Tools};
use hid_modifier_manager::core::parser::parse_device_filter;
use hid_modifier_manager::core::{apply, keys, report, ApplyOptions, DeviceId};
use hid_modifier_manager::ipc::{hidutil::list_keyboards, ClientMode, SystemRunner};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::collections::BTreeSet;
use std::env;

#[derive(Parser)]
#[command(name = "hid-modifier-manager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print current remappings for every attached keyboard
    Print,

    /// Set one or more remappings
    Set {
        /// Mappings as SRC,DST (e.g. caps_lock,control)
        #[arg(required = true)]
        mappings: Vec<String>,

        /// Only change this keyboard (VENDOR:PRODUCT in hex), repeatable
        #[arg(short, long = "keyboard", value_parser = parse_keyboard)]
        keyboards: Vec<DeviceId>,

        /// Path to modified hidutil. Needed if you want modifier
        /// changes to take effect immediately.
        #[arg(long, value_name = "PATH")]
        hidutil: Option<String>,

        /// Show unchanged mappings and the commands being run
        #[arg(short, long)]
        verbose: bool,

        /// Print changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// List key names with their usage codes, and aliases
    Keys,
}

fn parse_keyboard(value: &str) -> Result<DeviceId, String> {
    parse_device_filter(value).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug)?;

    match cli.command {
        Commands::Print => print_mappings()?,
        Commands::Set {
            mappings,
            keyboards,
            hidutil,
            verbose,
            dry_run,
        } => set_mappings(&mappings, keyboards, hidutil.as_deref(), verbose, dry_run)?,
        Commands::Keys => list_keys(),
    }

    Ok(())
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };

    TermLogger::init(
        level,
        ConfigBuilder::new().set_time_level(LevelFilter::Off).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

/// Print current remappings of all attached keyboards
fn print_mappings() -> anyhow::Result<()> {
    let runner = SystemRunner::new();
    let text = report::render(&runner, &Tools::default())?;
    print!("{}", text);
    Ok(())
}

/// Apply requested remappings to the selected keyboards
fn set_mappings(
    mappings: &[String],
    keyboards: Vec<DeviceId>,
    hidutil: Option<&str>,
    verbose: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let runner = SystemRunner::new();
    let tools = Tools::default();

    let keyboards: BTreeSet<DeviceId> = if keyboards.is_empty() {
        list_keyboards(&runner, &tools)?
    } else {
        keyboards.into_iter().collect()
    };

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));
    let helper = resolve_helper(hidutil, exe_dir.as_deref())?;

    let options = ApplyOptions {
        helper,
        verbose,
        mode: if dry_run { ClientMode::DryRun } else { ClientMode::Live },
    };

    let summary = apply(
        &runner,
        &tools,
        &keyboards,
        mappings,
        &options,
        &mut std::io::stdout(),
    )?;

    if dry_run {
        println!(
            "{} Dry run: {} keyboard(s) would change",
            "→".cyan(),
            summary.changed.len()
        );
    } else if summary.changed.is_empty() {
        println!("{} {}", "✓".green(), "No changes needed".bold());
    } else {
        println!(
            "{} Updated {} keyboard(s)",
            "✓".green().bold(),
            summary.changed.len()
        );
    }

    Ok(())
}

/// List alias names and what they expand to
fn list_keys() {
    println!("{}", "Keys".bold());
    for name in keys::key_names() {
        if let Ok(code) = keys::code_of(name) {
            println!("  {:<14} {}", name.cyan(), code);
        }
    }

    println!();
    println!("{}", "Aliases".bold());
    for alias in keys::alias_names() {
        match keys::expand_alias(alias) {
            Ok([single]) if *single == alias => continue,
            Ok(names) => println!("  {} → {}", alias.cyan().bold(), names.join(", ")),
            Err(_) => continue,
        }
    }
}
