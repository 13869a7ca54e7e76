//! settingsync CLI - Sync your editor settings across machines.
//!
//! Upload/download settings, keybindings, snippets và extensions qua
//! GitHub Gist. Mỗi invocation là một operation duy nhất.

use anyhow::Result;
use clap::Parser;
use settingsync::cli::{commands, Cli, Commands};
use settingsync::config::SyncConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { token } => {
            commands::login(token)?;
        }
        Commands::Connect { gist_id } => {
            commands::connect(gist_id)?;
        }
        Commands::Upload { public, anonymous } => {
            commands::upload_settings(public, anonymous)?;
        }
        Commands::Share => {
            commands::share_settings()?;
        }
        Commands::Download => {
            commands::download_settings()?;
        }
        Commands::Reset => {
            commands::reset_settings()?;
        }
        Commands::Toggle { flag } => {
            commands::toggle(flag)?;
        }
        Commands::Preserve { key, value } => {
            commands::preserve(key, value)?;
        }
        Commands::Watch => {
            let config = SyncConfig::load_default()?;
            // Download trước khi watch nếu user bật auto-download
            if config.auto_download && config.gist_available() {
                commands::download_settings()?;
            }
            commands::watch()?;
        }
    }

    Ok(())
}
