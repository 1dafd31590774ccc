use anyhow::{Context, Result, bail};
use clap::Args;

use drm_playready::format::{soap, wrm_header::WrmHeader};

use super::args::{DeviceArgs, InitDataArgs};

/**
    Acquire content decryption keys from a PlayReady license server.
*/
#[derive(Args)]
pub struct GetKeysCommand {
    #[command(flatten)]
    device: DeviceArgs,

    #[command(flatten)]
    init_data: InitDataArgs,

    /// License server URL. Defaults to the header's LA_URL.
    #[arg(short, long)]
    url: Option<String>,

    /// Additional HTTP headers in "Key: Value" format. Can be repeated.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

impl GetKeysCommand {
    pub async fn run(self) -> Result<()> {
        let cdm = self.device.cdm()?;
        let header = self.init_data.wrm_header()?;
        let wrm = WrmHeader::from_xml(&header).context("failed to parse WRM header")?;
        eprintln!("Header contains {} key ID(s)", wrm.kids.len());

        let url = match self.url.clone().or(wrm.la_url) {
            Some(url) => url,
            None => bail!("no --url given and the header has no LA_URL"),
        };

        let challenge = cdm
            .challenge(&header)
            .context("failed to build license challenge")?;
        eprintln!("Built challenge ({} bytes)", challenge.len());

        let client = reqwest::Client::new();
        let mut request = client
            .post(&url)
            .header("Content-Type", soap::CONTENT_TYPE)
            .header("SOAPAction", soap::ACQUIRE_LICENSE_ACTION)
            .body(challenge);
        for h in &self.headers {
            let (key, value) = parse_header(h)?;
            request = request.header(key, value);
        }

        eprintln!("Sending challenge to {url}");
        let response = request.send().await.context("HTTP request failed")?;
        let status = response.status();
        let body = response.text().await.context("failed to read response")?;
        eprintln!("Received response ({} bytes)", body.len());

        // Servers answer faults with HTTP 500, so the body is checked first.
        let keys = match cdm.parse_license(&body) {
            Ok(keys) => keys,
            Err(e) if !status.is_success() => {
                bail!("license server returned HTTP {status}: {e}")
            }
            Err(e) => return Err(e).context("failed to parse license response"),
        };

        eprintln!("Extracted {} keys:", keys.len());
        for key in &keys {
            println!("{}", key.to_content_key());
        }

        Ok(())
    }
}

fn parse_header(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once(':')
        .context("header must be in 'Key: Value' format")?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap(),
            ("Authorization".to_string(), "Bearer a:b".to_string())
        );
        assert!(parse_header("no separator").is_err());
    }
}
