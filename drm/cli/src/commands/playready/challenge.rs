use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use drm_playready::format::soap::wrap_key_message;

use super::args::{DeviceArgs, InitDataArgs};

/**
    Build a license challenge without sending it.
*/
#[derive(Args)]
pub struct ChallengeCommand {
    #[command(flatten)]
    device: DeviceArgs,

    #[command(flatten)]
    init_data: InitDataArgs,

    /// Write the UTF-16 PlayReadyKeyMessage a page would receive instead of
    /// the bare SOAP challenge.
    #[arg(long)]
    key_message: bool,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ChallengeCommand {
    pub fn run(self) -> Result<()> {
        let cdm = self.device.cdm()?;
        let header = self.init_data.wrm_header()?;
        let challenge = cdm
            .challenge(&header)
            .context("failed to build license challenge")?;
        eprintln!("Built challenge ({} bytes)", challenge.len());

        let bytes = if self.key_message {
            wrap_key_message(challenge.as_bytes())
        } else {
            challenge.into_bytes()
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &bytes).context("failed to write challenge")?;
                eprintln!("Wrote {}", path.display());
            }
            None => {
                use std::io::Write;
                std::io::stdout()
                    .write_all(&bytes)
                    .context("failed to write challenge")?;
                println!();
            }
        }

        Ok(())
    }
}
