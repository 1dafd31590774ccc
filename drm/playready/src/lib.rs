/*!
    A software PlayReady CDM.

    - [`Device`] loads PRD device blobs.
    - [`extract_wrm_headers`] finds WRM headers in EME init data.
    - [`build_challenge`] produces signed SOAP license challenges.
    - [`process_license`] unwraps and verifies content keys from XMR licenses.
    - [`Cdm`] ties these together for one device.
*/

mod cdm;
mod challenge;
mod constants;
mod device;
mod error;
mod init_data;
mod license;
mod pssh_ext;

pub mod crypto;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod format {
    pub use drm_playready_format::*;
}

// Re-export shared DRM types from drm-core
pub use drm_core::{ContentKey, PLAYREADY_SYSTEM_ID, PsshBox, PsshError, SystemId, parse_kid};

pub use self::cdm::Cdm;
pub use self::challenge::{ChallengeOptions, build_challenge};
pub use self::constants::{DEFAULT_CLIENT_VERSION, MAGIC_CONSTANT_ZERO, WMRM_SERVER_KEY};
pub use self::device::Device;
pub use self::error::{CdmError, CdmResult, ErrorKind};
pub use self::init_data::{extract_wrm_header, extract_wrm_headers};
pub use self::license::{
    RecoveredKey, check_soap_fault, extract_license_blobs, parse_license_response,
    process_license, process_license_response,
};
pub use self::pssh_ext::PlayReadyExt;
