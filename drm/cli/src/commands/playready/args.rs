use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::debug;

use drm_core::PsshBox;
use drm_eme::{DeviceRegistry, DeviceSelector, Profile};
use drm_playready::{Cdm, Device, extract_wrm_header};

/**
    Device selection shared by the commands that talk to a license server.
*/
#[derive(Args)]
pub struct DeviceArgs {
    /// Path to the .prd device file.
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// YAML profile. Device names resolve to `<name>.prd` next to it.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Scope to select a profile device for.
    #[arg(long, default_value = "")]
    scope: String,

    /// Client version announced in challenges. Overrides the profile.
    #[arg(long)]
    client_version: Option<String>,
}

impl DeviceArgs {
    pub fn cdm(&self) -> Result<Cdm> {
        let profile = match &self.profile {
            Some(path) => load_profile(path)?,
            None => Profile::default(),
        };

        let device = match (&self.device, &self.profile) {
            (Some(path), _) => Arc::new(load_device(path)?),
            (None, Some(path)) => {
                let registry = load_registry(path, profile.clone())?;
                registry
                    .select(&self.scope)
                    .with_context(|| format!("no device for scope {:?}", self.scope))?
            }
            (None, None) => bail!("either --device or --profile is required"),
        };

        let mut options = profile.challenge_options();
        if let Some(version) = &self.client_version {
            options.client_version = version.clone();
        }
        Ok(Cdm::new(device).with_options(options))
    }
}

/**
    Where the WRM header comes from. Exactly one source is required.
*/
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct InitDataArgs {
    /// Base64-encoded PSSH box.
    #[arg(short, long)]
    pssh: Option<String>,

    /// Raw init data file: PSSH box, PlayReady header object or UTF-16 header.
    #[arg(long)]
    init_data: Option<PathBuf>,

    /// WRM header XML file.
    #[arg(long)]
    header: Option<PathBuf>,
}

impl InitDataArgs {
    pub fn wrm_header(&self) -> Result<String> {
        if let Some(pssh) = &self.pssh {
            let pssh = PsshBox::from_base64(pssh).context("failed to parse PSSH box")?;
            return extract_wrm_header(&pssh.to_bytes()).context("no PlayReady header in PSSH");
        }
        if let Some(path) = &self.init_data {
            let data = std::fs::read(path).context("failed to read init data file")?;
            return extract_wrm_header(&data).context("no PlayReady header in init data");
        }
        if let Some(path) = &self.header {
            let xml = std::fs::read_to_string(path).context("failed to read header file")?;
            return Ok(xml.trim().to_string());
        }
        bail!("one of --pssh, --init-data or --header is required")
    }
}

/**
    Load a device from a binary .prd file, or from one holding its base64.
*/
pub fn load_device(path: &Path) -> Result<Device> {
    let data = std::fs::read(path).context("failed to read PRD file")?;
    match Device::from_bytes(&data) {
        Ok(device) => Ok(device),
        Err(e) => match std::str::from_utf8(&data) {
            Ok(text) => Device::from_base64(text).context("failed to parse PRD file"),
            Err(_) => Err(e).context("failed to parse PRD file"),
        },
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    let text = std::fs::read_to_string(path).context("failed to read profile")?;
    Profile::from_yaml(&text).context("failed to parse profile")
}

fn load_registry(path: &Path, profile: Profile) -> Result<DeviceRegistry> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut names: Vec<String> = profile
        .default_device
        .iter()
        .chain(profile.scopes.values())
        .cloned()
        .collect();
    names.sort();
    names.dedup();

    let mut registry = DeviceRegistry::new(profile);
    for name in names {
        let device_path = dir.join(format!("{name}.prd"));
        let device = load_device(&device_path)
            .with_context(|| format!("failed to load device {name:?}"))?;
        debug!(name, path = %device_path.display(), "device loaded");
        registry.insert(name, device);
    }
    Ok(registry)
}
