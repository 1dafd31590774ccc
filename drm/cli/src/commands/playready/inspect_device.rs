use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::args::load_device;

/**
    Inspect a PRD device file.
*/
#[derive(Args)]
pub struct InspectDeviceCommand {
    /// Path to the .prd file.
    pub path: PathBuf,
}

impl InspectDeviceCommand {
    pub fn run(self) -> Result<()> {
        let device = load_device(&self.path)?;
        let chain = device.certificate_chain();

        println!("Version:           {}", device.version());
        println!(
            "Certificate Chain: {} bytes{}",
            chain.len(),
            if chain.starts_with(b"CHAI") {
                ""
            } else {
                " (no CHAI magic)"
            }
        );
        println!(
            "Encryption Key:    {}",
            hex::encode(device.encryption_public_key())
        );
        println!(
            "Signing Key:       {}",
            hex::encode(device.signing_public_key())
        );
        match device.group_key() {
            Some(key) => println!("Group Key:         {}", hex::encode(key.public_bytes())),
            None => println!("Group Key:         absent"),
        }

        Ok(())
    }
}
