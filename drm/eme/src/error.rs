use thiserror::Error;

use drm_core::SystemId;
use drm_playready::CdmError;

/**
    Errors from the host-facing session layer.
*/
#[derive(Debug, Clone, Error)]
pub enum EmeError {
    #[error("no device selected for scope {0:?}")]
    NoDeviceSelected(String),
    #[error("no key system registered for {0}")]
    UnsupportedSystem(SystemId),
    #[error("unknown session {0:?}")]
    UnknownSession(String),
    #[error(transparent)]
    Cdm(#[from] CdmError),
    #[error("ClearKey: {0}")]
    ClearKey(String),
    #[error("configuration: {0}")]
    Config(String),
}

pub type EmeResult<T> = std::result::Result<T, EmeError>;
