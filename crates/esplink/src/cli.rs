//! Clap derive structures for the `esplink` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use esplink_core::LogLevel;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// esplink -- follow one ESPHome-class device from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "esplink",
    version,
    about = "Watch an ESPHome device's entities, states and logs",
    long_about = "Connects to a single ESPHome-class device, keeps the connection alive,\n\
        and prints every status change, entity state, log line and BLE\n\
        advertisement as one JSON object per line.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "ESPLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device hostname or IP (overrides profile)
    #[arg(long, short = 'H', env = "ESPLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Native API port (overrides profile)
    #[arg(long, short = 'P', env = "ESPLINK_PORT", global = true)]
    pub port: Option<u16>,

    /// Device password (prefer the keyring or ESPLINK_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "ESPLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and stream notifications as JSON lines
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Recorded session to replay (JSON lines of protocol events)
    #[arg(long, short = 's')]
    pub script: PathBuf,

    /// Stop after the first session instead of reconnecting
    #[arg(long)]
    pub once: bool,

    /// Device log level (NONE, ERROR, WARN, INFO, CONFIG, DEBUG, VERBOSE, VERY_VERBOSE or 0-7)
    #[arg(long, short = 'l', value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Ask the device to dump its configuration into the log stream
    #[arg(long)]
    pub log_dump: bool,

    /// Relay BLE advertisements
    #[arg(long)]
    pub ble: bool,

    /// Print the final entity list and device info on exit
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the loaded configuration (passwords masked)
    Show,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    if let Ok(n) = s.parse::<u8>() {
        return LogLevel::from_repr(n).ok_or_else(|| format!("unknown log level {n}"));
    }
    s.parse::<LogLevel>()
        .map_err(|_| format!("unknown log level '{s}'"))
}
