use anyhow::{Context, Result};
use clap::Args;

use drm_core::{PsshBox, SystemId, format_uuid};
use drm_playready::PlayReadyExt;
use drm_playready::format::wrm_header::WrmHeader;

/**
    Inspect a PSSH box.
*/
#[derive(Args)]
pub struct InspectPsshCommand {
    /// Base64-encoded PSSH box.
    pub base64: String,
}

impl InspectPsshCommand {
    pub fn run(self) -> Result<()> {
        let pssh = PsshBox::from_base64(&self.base64).context("failed to parse PSSH box")?;

        println!("Version:    {}", pssh.version);
        println!("System ID:  {}", pssh.system_id());
        println!("Data Size:  {} bytes", pssh.data.len());

        if !pssh.key_ids.is_empty() {
            println!();
            println!("Key IDs ({}):", pssh.key_ids.len());
            for kid in &pssh.key_ids {
                println!("  {}", format_uuid(kid));
            }
        }

        if pssh.system_id() != SystemId::PlayReady {
            return Ok(());
        }

        let headers = pssh
            .playready_wrm_headers()
            .context("failed to read PlayReady header")?;
        for xml in headers {
            let wrm = match WrmHeader::from_xml(&xml) {
                Ok(wrm) => wrm,
                Err(e) => {
                    println!();
                    println!("WRM Header: unparsable ({e})");
                    continue;
                }
            };
            println!();
            println!("WRM Header: v{}", wrm.version);
            println!("Protocol:   {}", wrm.protocol_version());
            if let Some(url) = &wrm.la_url {
                println!("LA URL:     {url}");
            }
            if let Some(url) = &wrm.lui_url {
                println!("LUI URL:    {url}");
            }
            if let Some(ds_id) = &wrm.ds_id {
                println!("DS ID:      {ds_id}");
            }
            if !wrm.kids.is_empty() {
                println!();
                println!("PlayReady Key IDs ({}):", wrm.kids.len());
                for kid in &wrm.kids {
                    match &kid.algorithm {
                        Some(alg) => println!("  {} ({alg})", format_uuid(&kid.kid)),
                        None => println!("  {}", format_uuid(&kid.kid)),
                    }
                }
            }
        }

        Ok(())
    }
}
