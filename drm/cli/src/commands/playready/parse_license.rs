use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use drm_core::ContentKey;
use drm_eme::clearkey;
use drm_playready::RecoveredKey;

use super::args::load_device;

/**
    Recover content keys from a saved license response.
*/
#[derive(Args)]
pub struct ParseLicenseCommand {
    /// Path to the .prd device file the license was issued to.
    #[arg(short, long)]
    device: PathBuf,

    /// License server response (SOAP XML).
    response: PathBuf,

    /// Print the keys as a ClearKey JSON license instead of `kid:key` lines.
    #[arg(long)]
    clearkey: bool,
}

impl ParseLicenseCommand {
    pub fn run(self) -> Result<()> {
        let cdm = drm_playready::Cdm::new(load_device(&self.device)?);
        let response =
            std::fs::read_to_string(&self.response).context("failed to read license response")?;

        let keys = cdm
            .parse_license(&response)
            .context("failed to parse license response")?;

        eprintln!("Extracted {} keys:", keys.len());
        for key in &keys {
            eprintln!("  {} {}", key.key_type, key.cipher_type);
        }

        println!("{}", render_keys(&keys, self.clearkey));

        Ok(())
    }
}

/**
    One `kid:key` line per key, or a ClearKey license a page can load.
*/
fn render_keys(keys: &[RecoveredKey], as_clearkey: bool) -> String {
    let content_keys: Vec<ContentKey> = keys.iter().map(ContentKey::from).collect();
    if as_clearkey {
        clearkey::build_license(&content_keys)
    } else {
        content_keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
