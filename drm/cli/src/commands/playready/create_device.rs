use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::Args;

use drm_playready::Device;
use drm_playready::crypto::ecc::EccKey;

/**
    Create a .prd device file.

    Key files can be either 32 bytes (private key only, public key derived
    via P-256) or 96 bytes (32-byte private + 64-byte public). Keys that are
    not given are generated.
*/
#[derive(Args)]
pub struct CreateDeviceCommand {
    /// Encryption key file. Generated when omitted.
    #[arg(short, long)]
    encryption_key: Option<PathBuf>,

    /// Signing key file. Generated when omitted.
    #[arg(short, long)]
    signing_key: Option<PathBuf>,

    /// Group certificate chain file, stored as-is.
    #[arg(short, long)]
    certificate: PathBuf,

    /// Group key file. Optional.
    #[arg(short, long)]
    group_key: Option<PathBuf>,

    /// Output file path.
    #[arg(short, long, default_value = "device.prd")]
    output: PathBuf,
}

impl CreateDeviceCommand {
    pub fn run(self) -> Result<()> {
        let cert_data =
            std::fs::read(&self.certificate).context("failed to read certificate file")?;
        ensure!(!cert_data.is_empty(), "certificate file is empty");
        if !cert_data.starts_with(b"CHAI") {
            eprintln!("Warning: certificate chain does not start with CHAI magic");
        }
        eprintln!("Loaded certificate chain ({} bytes)", cert_data.len());

        let encryption_key = load_or_generate(self.encryption_key.as_deref(), "encryption")?;
        let signing_key = load_or_generate(self.signing_key.as_deref(), "signing")?;

        let mut device = Device::new(cert_data, encryption_key, signing_key);
        if let Some(path) = &self.group_key {
            device = device.with_group_key(read_key(path).context("failed to read group key")?);
            eprintln!("Loaded group key");
        }

        let prd_bytes = device.to_bytes();
        std::fs::write(&self.output, &prd_bytes).context("failed to write PRD file")?;
        eprintln!(
            "Created {} ({} bytes)",
            self.output.display(),
            prd_bytes.len()
        );

        println!("Version:         {}", device.version());
        println!(
            "Group Key:       {}",
            if device.group_key().is_some() {
                "present"
            } else {
                "absent"
            }
        );
        println!(
            "Encryption Key:  {}",
            hex::encode(device.encryption_public_key())
        );
        println!("Signing Key:     {}", hex::encode(device.signing_public_key()));

        Ok(())
    }
}

fn load_or_generate(path: Option<&Path>, role: &str) -> Result<EccKey> {
    match path {
        Some(path) => {
            let key = read_key(path).with_context(|| format!("failed to read {role} key"))?;
            eprintln!("Loaded {role} key");
            Ok(key)
        }
        None => {
            eprintln!("Generated {role} key");
            Ok(EccKey::generate())
        }
    }
}

/**
    Read a 32-byte private key, or a 96-byte keypair whose public half must
    match the private one.
*/
fn read_key(path: &Path) -> Result<EccKey> {
    let data = std::fs::read(path)?;
    let key = match data.len() {
        32 | 96 => EccKey::from_private_bytes(&data[..32])?,
        n => bail!("key file must be 32 bytes (private only) or 96 bytes (keypair), got {n}"),
    };
    if data.len() == 96 {
        ensure!(
            key.public_bytes()[..] == data[32..],
            "public key does not match private key"
        );
    }
    Ok(key)
}
