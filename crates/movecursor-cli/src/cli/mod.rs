//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use movecursor_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "move-cursor")]
#[command(version)]
#[command(about = "Scroll the focused terminal with Page Up/Down without focusing it")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the log level from config (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Disable Shift + key horizontal scrolling
    #[arg(long = "no-horizontal")]
    no_horizontal: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Listen for hotkeys and scroll the focused terminal (default)
    Run,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Cli {
        command,
        log_level,
        no_horizontal,
    } = cli;

    match command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let mut config = config::Config::load().context("load config")?;
            if let Some(level) = log_level {
                config.log_level = level;
            }
            if no_horizontal {
                config.horizontal_scroll_enabled = false;
            }
            commands::run::run(&config)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
