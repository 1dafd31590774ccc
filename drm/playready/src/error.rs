use core::fmt;

use thiserror::Error;

use drm_core::PsshError;
use drm_playready_format::FormatError;

/**
    Errors from the PlayReady CDM.
*/
#[derive(Debug, Clone, Error)]
pub enum CdmError {
    // ── Init data ────────────────────────────────────────────────────
    #[error("no PlayReady header found in init data: {0}")]
    InitData(String),
    #[error(transparent)]
    Pssh(#[from] PsshError),

    // ── Challenge ────────────────────────────────────────────────────
    #[error("invalid WRM header: {0}")]
    InvalidHeader(FormatError),

    // ── Format errors (delegated to drm-playready-format) ────────────
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    // ── Base64 / XML ─────────────────────────────────────────────────
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    #[error("invalid XML: {0}")]
    InvalidXml(String),
    #[error("SOAP fault: {0}")]
    SoapFault(String),

    // ── ECC ──────────────────────────────────────────────────────────
    #[error("ECC key parse failed: {0}")]
    EccKeyParse(String),
    #[error("ECC operation failed: {0}")]
    EccOperation(String),
    #[error("ElGamal decryption failed: {0}")]
    ElGamalDecryptFailed(String),

    // ── License processing ───────────────────────────────────────────
    #[error("no licenses in response")]
    NoLicenses,
    #[error("device key mismatch: license encrypted for different device")]
    DeviceKeyMismatch,
    #[error("license has no signature record")]
    MissingSignature,
    #[error("scalable license has no auxiliary key")]
    MissingAuxiliaryKey,
    #[error("encrypted key too short for {cipher}: {len} bytes")]
    EncryptedKeyTooShort { cipher: &'static str, len: usize },
    #[error("license integrity check failed")]
    IntegrityCheckFailed,
}

/**
    Coarse error categories, for hosts that only need to decide how to
    react (fall back, retry, give up) rather than what went wrong.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InitData,
    Challenge,
    Crypto,
    Parse,
    Integrity,
}

impl CdmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InitData(_) | Self::Pssh(_) => ErrorKind::InitData,
            Self::InvalidHeader(_) => ErrorKind::Challenge,
            Self::EccKeyParse(_) | Self::EccOperation(_) | Self::ElGamalDecryptFailed(_) => {
                ErrorKind::Crypto
            }
            Self::Format(_)
            | Self::InvalidBase64(_)
            | Self::InvalidXml(_)
            | Self::SoapFault(_)
            | Self::NoLicenses
            | Self::MissingSignature
            | Self::MissingAuxiliaryKey
            | Self::EncryptedKeyTooShort { .. } => ErrorKind::Parse,
            Self::DeviceKeyMismatch | Self::IntegrityCheckFailed => ErrorKind::Integrity,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InitData => "init data",
            Self::Challenge => "challenge",
            Self::Crypto => "crypto",
            Self::Parse => "parse",
            Self::Integrity => "integrity",
        })
    }
}

/**
    Type alias for results that may return a [`CdmError`].
*/
pub type CdmResult<T> = std::result::Result<T, CdmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(CdmError::InitData("x".into()).kind(), ErrorKind::InitData);
        assert_eq!(
            CdmError::InvalidHeader(FormatError::MissingElement("WRMHEADER")).kind(),
            ErrorKind::Challenge
        );
        assert_eq!(CdmError::EccKeyParse("x".into()).kind(), ErrorKind::Crypto);
        assert_eq!(
            CdmError::from(FormatError::InvalidUtf16).kind(),
            ErrorKind::Parse
        );
        assert_eq!(CdmError::IntegrityCheckFailed.kind(), ErrorKind::Integrity);
    }
}
