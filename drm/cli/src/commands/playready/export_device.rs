use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use super::args::load_device;

/**
    Export a .prd device file to its raw components.

    Writes the encryption key, signing key, group key, and group certificate
    chain to separate files, the inverse of `create-device`.
*/
#[derive(Args)]
pub struct ExportDeviceCommand {
    /// Path to the .prd file.
    path: PathBuf,

    /// Output directory. Defaults to the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportDeviceCommand {
    pub fn run(self) -> Result<()> {
        let device = load_device(&self.path)?;

        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("device");
        let out_path = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(stem);

        if out_path.exists() {
            let has_entries = std::fs::read_dir(&out_path)
                .map(|mut d| d.next().is_some())
                .unwrap_or(false);
            if has_entries {
                bail!("output directory {} is not empty", out_path.display());
            }
        } else {
            std::fs::create_dir_all(&out_path).context("failed to create output directory")?;
        }

        let mut files = vec![
            ("zprivencr.dat", device.encryption_key().private_bytes().to_vec()),
            ("zprivsig.dat", device.signing_key().private_bytes().to_vec()),
            ("bgroupcert.dat", device.certificate_chain().to_vec()),
        ];
        match device.group_key() {
            Some(key) => files.push(("zgpriv.dat", key.private_bytes().to_vec())),
            None => eprintln!("No group key, skipping zgpriv.dat"),
        }

        for (name, bytes) in files {
            let path = out_path.join(name);
            std::fs::write(&path, bytes).with_context(|| format!("failed to write {name}"))?;
            eprintln!("Exported {}", path.display());
        }

        println!("Version:         {}", device.version());
        println!("Exported to:     {}", out_path.display());

        Ok(())
    }
}
