use tracing::debug;

use drm_core::SystemId;
use drm_playready::format::soap::{wrap_key_message, wrm_header_from_key_message};
use drm_playready::format::utf16::decode_utf16le_strict;
use drm_playready::{Cdm, CdmError, extract_wrm_header};

use crate::error::EmeResult;
use crate::key::SessionKey;
use crate::registry::{DeviceRegistry, DeviceSelector};
use crate::system::{KeySystem, PendingChallenge};

const KEY_MESSAGE_TAG: &str = "<PlayReadyKeyMessage";

/**
    PlayReady through the local CDM, with the device chosen per scope.

    Challenges go back to the page wrapped in a `PlayReadyKeyMessage`,
    so they can stand in for what the page's own CDM would have produced.
*/
#[derive(Debug)]
pub struct PlayReadySystem<S = DeviceRegistry> {
    selector: S,
    client_version: Option<String>,
}

impl PlayReadySystem<DeviceRegistry> {
    /**
        Use a registry, taking the client version from its profile.
    */
    pub fn from_registry(registry: DeviceRegistry) -> Self {
        let client_version = registry.profile().client_version.clone();
        Self {
            selector: registry,
            client_version,
        }
    }
}

impl<S: DeviceSelector> PlayReadySystem<S> {
    pub fn new(selector: S) -> Self {
        Self {
            selector,
            client_version: None,
        }
    }

    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = Some(version.into());
        self
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    fn cdm(&self, scope: &str) -> EmeResult<Cdm> {
        let device = self.selector.select(scope)?;
        let mut cdm = Cdm::new(device);
        if let Some(version) = &self.client_version {
            let mut options = cdm.options().clone();
            options.client_version = version.clone();
            cdm = cdm.with_options(options);
        }
        Ok(cdm)
    }
}

/**
    Pull the WRM header out of either a page-side key message or raw init
    data.
*/
fn header_from_input(input: &[u8]) -> Result<String, CdmError> {
    let is_key_message =
        decode_utf16le_strict(input).is_some_and(|text| text.contains(KEY_MESSAGE_TAG));
    if is_key_message {
        Ok(wrm_header_from_key_message(input)?)
    } else {
        extract_wrm_header(input)
    }
}

impl<S: DeviceSelector> KeySystem for PlayReadySystem<S> {
    fn system_id(&self) -> SystemId {
        SystemId::PlayReady
    }

    fn create_challenge(&self, scope: &str, init_data: &[u8]) -> EmeResult<PendingChallenge> {
        let header = header_from_input(init_data)?;
        let challenge = self.cdm(scope)?.challenge(&header)?;
        debug!(scope, challenge_len = challenge.len(), "PlayReady challenge built");
        Ok(PendingChallenge {
            message: wrap_key_message(challenge.as_bytes()),
            header,
        })
    }

    fn complete(&self, scope: &str, _header: &str, response: &[u8]) -> EmeResult<Vec<SessionKey>> {
        let response =
            std::str::from_utf8(response).map_err(|e| CdmError::InvalidXml(e.to_string()))?;
        let keys = self.cdm(scope)?.parse_license(response)?;
        Ok(keys.iter().map(SessionKey::from).collect())
    }
}
