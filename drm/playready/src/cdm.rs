use std::sync::Arc;

use tracing::{debug, warn};

use drm_core::PsshBox;

use crate::challenge::{ChallengeOptions, build_challenge};
use crate::device::Device;
use crate::error::{CdmError, CdmResult};
use crate::init_data::extract_wrm_header;
use crate::license::{RecoveredKey, process_license_response};
use crate::pssh_ext::PlayReadyExt;

/**
    A PlayReady CDM bound to one device.

    Stateless between calls: every challenge uses fresh ephemeral keys and
    license processing needs only the device, so one `Cdm` can serve any
    number of concurrent sessions.
*/
#[derive(Debug, Clone)]
pub struct Cdm {
    device: Arc<Device>,
    options: ChallengeOptions,
}

impl Cdm {
    pub fn new(device: impl Into<Arc<Device>>) -> Self {
        Self {
            device: device.into(),
            options: ChallengeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChallengeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn options(&self) -> &ChallengeOptions {
        &self.options
    }

    /**
        Build a SOAP license challenge for a WRM header string.
    */
    pub fn challenge(&self, wrm_header: &str) -> CdmResult<String> {
        build_challenge(&self.device, wrm_header, &self.options)
    }

    /**
        Extract the WRM header from EME init data and build a challenge.
        Returns the header alongside the challenge.
    */
    pub fn challenge_for_init_data(&self, init_data: &[u8]) -> CdmResult<(String, String)> {
        let header = extract_wrm_header(init_data)?;
        let challenge = self.challenge(&header)?;
        Ok((header, challenge))
    }

    pub fn challenge_for_pssh(&self, pssh: &PsshBox) -> CdmResult<String> {
        let header = pssh
            .playready_wrm_headers()?
            .into_iter()
            .next()
            .ok_or_else(|| CdmError::InitData("no WRM header in PSSH".into()))?;
        self.challenge(&header)
    }

    /**
        Recover content keys from a license response.

        Containers that fail to parse or verify are dropped with a warning
        and contribute no keys. The first such error is returned only when
        no container produced a key.
    */
    pub fn parse_license(&self, response: &str) -> CdmResult<Vec<RecoveredKey>> {
        let mut keys = Vec::new();
        let mut first_error = None;

        for (index, container) in process_license_response(&self.device, response)?
            .into_iter()
            .enumerate()
        {
            match container {
                Ok(recovered) => keys.extend(recovered),
                Err(e) => {
                    warn!(index, error = %e, "dropping license container");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if keys.is_empty() => Err(e),
            _ => {
                debug!(keys = keys.len(), "license processed");
                Ok(keys)
            }
        }
    }
}
