use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{InspectPsshCommand, PlayReadyCommand};

/**
    DRM command-line tool.
*/
#[derive(Parser)]
#[command(name = "drm-cli")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// PlayReady DRM commands.
    #[command(name = "playready")]
    PlayReady(PlayReadyCommand),
    /// Inspect a PSSH box.
    InspectPssh(InspectPsshCommand),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::PlayReady(cmd) => cmd.run().await,
            Command::InspectPssh(cmd) => cmd.run(),
        }
    }
}
