/*!
    PlayReady device (PRD file) loading and management.

    A device contains:
    - Group key (ECC P-256 keypair), optional, only present in version 3 files
    - Encryption key (ECC P-256 keypair) for ElGamal key transport
    - Signing key (ECC P-256 keypair) for ECDSA challenge signing
    - Group certificate chain (BCert), carried opaquely

    Supports PRD format versions 2 and 3.
*/

use core::fmt;

use data_encoding::BASE64;

use drm_playready_format::prd::{PrdFile, RawEccKey};

use crate::crypto::ecc::EccKey;
use crate::error::{CdmError, CdmResult};

/**
    A loaded PlayReady device. Immutable once constructed.
*/
#[derive(Clone, PartialEq, Eq)]
pub struct Device {
    version: u8,
    group_key: Option<EccKey>,
    encryption_key: EccKey,
    signing_key: EccKey,
    certificate_chain: Vec<u8>,
}

impl Device {
    /**
        Assemble a device from existing keys and a certificate chain.
    */
    pub fn new(
        certificate_chain: impl Into<Vec<u8>>,
        encryption_key: EccKey,
        signing_key: EccKey,
    ) -> Self {
        Self {
            version: 3,
            group_key: None,
            encryption_key,
            signing_key,
            certificate_chain: certificate_chain.into(),
        }
    }

    /**
        A device with fresh random encryption and signing keys. Useful for
        testing; license servers will reject the certificate chain.
    */
    pub fn generate(certificate_chain: impl Into<Vec<u8>>) -> Self {
        Self::new(certificate_chain, EccKey::generate(), EccKey::generate())
    }

    pub fn with_group_key(mut self, group_key: EccKey) -> Self {
        self.group_key = Some(group_key);
        self
    }

    /**
        Load a PRD blob. Only the private scalars are read; public points
        are re-derived from them.
    */
    pub fn from_bytes(data: &[u8]) -> CdmResult<Self> {
        let prd = PrdFile::from_bytes(data)?;
        Ok(Self {
            version: prd.version,
            group_key: load_group_key(prd.group_key.as_ref())?,
            encryption_key: EccKey::from_private_bytes(&prd.encryption_key.private_key)?,
            signing_key: EccKey::from_private_bytes(&prd.signing_key.private_key)?,
            certificate_chain: prd.certificate_chain,
        })
    }

    pub fn from_base64(data: &str) -> CdmResult<Self> {
        let bytes = BASE64
            .decode(data.trim().as_bytes())
            .map_err(|e| CdmError::InvalidBase64(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /**
        Serialize as a version 3 PRD file.
    */
    pub fn to_bytes(&self) -> Vec<u8> {
        PrdFile {
            version: 3,
            group_key: self.group_key.as_ref().map(EccKey::to_raw),
            encryption_key: self.encryption_key.to_raw(),
            signing_key: self.signing_key.to_raw(),
            certificate_chain: self.certificate_chain.clone(),
        }
        .to_bytes()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.to_bytes())
    }

    /**
        Format version of the blob this device was loaded from.
    */
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn certificate_chain(&self) -> &[u8] {
        &self.certificate_chain
    }

    pub fn group_key(&self) -> Option<&EccKey> {
        self.group_key.as_ref()
    }

    pub fn encryption_key(&self) -> &EccKey {
        &self.encryption_key
    }

    pub fn signing_key(&self) -> &EccKey {
        &self.signing_key
    }

    pub fn encryption_public_key(&self) -> &[u8; 64] {
        self.encryption_key.public_bytes()
    }

    pub fn signing_public_key(&self) -> &[u8; 64] {
        self.signing_key.public_bytes()
    }
}

/*
    Serialized devices without a group key carry a zero-filled slot, which
    is not a valid scalar.
*/
fn load_group_key(raw: Option<&RawEccKey>) -> CdmResult<Option<EccKey>> {
    match raw {
        Some(raw) if raw.private_key != [0u8; 32] => {
            EccKey::from_private_bytes(&raw.private_key).map(Some)
        }
        _ => Ok(None),
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("version", &self.version)
            .field("has_group_key", &self.group_key.is_some())
            .field("encryption_key", &self.encryption_key)
            .field("signing_key", &self.signing_key)
            .field("certificate_chain_len", &self.certificate_chain.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drm_playready_format::FormatError;

    fn v2_blob(cert: &[u8], enc: &EccKey, sign: &EccKey) -> Vec<u8> {
        let mut blob = b"PRD".to_vec();
        blob.push(2);
        blob.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        blob.extend_from_slice(cert);
        blob.extend_from_slice(&enc.to_raw().to_bytes());
        blob.extend_from_slice(&sign.to_raw().to_bytes());
        blob
    }

    #[test]
    fn loads_version_2() {
        let enc = EccKey::generate();
        let sign = EccKey::generate();
        let device = Device::from_bytes(&v2_blob(b"chain", &enc, &sign)).unwrap();

        assert_eq!(device.version(), 2);
        assert_eq!(device.certificate_chain(), b"chain");
        assert_eq!(device.encryption_key(), &enc);
        assert_eq!(device.signing_key(), &sign);
        assert!(device.group_key().is_none());
    }

    #[test]
    fn version_3_round_trip() {
        let device = Device::generate(vec![0xC3; 300]).with_group_key(EccKey::generate());
        let loaded = Device::from_bytes(&device.to_bytes()).unwrap();
        assert_eq!(loaded, device);
        assert_eq!(loaded.version(), 3);

        let via_base64 = Device::from_base64(&device.to_base64()).unwrap();
        assert_eq!(via_base64, device);
    }

    #[test]
    fn zero_group_key_loads_as_absent() {
        let device = Device::generate(b"cert".to_vec());
        let loaded = Device::from_bytes(&device.to_bytes()).unwrap();
        assert!(loaded.group_key().is_none());
    }

    #[test]
    fn stored_public_half_is_ignored() {
        let enc = EccKey::generate();
        let sign = EccKey::generate();
        let mut blob = v2_blob(b"c", &enc, &sign);
        // Corrupt the stored public point of the encryption key.
        let pub_start = 4 + 4 + 1 + 32;
        blob[pub_start..pub_start + 64].fill(0);
        let device = Device::from_bytes(&blob).unwrap();
        assert_eq!(device.encryption_public_key(), enc.public_bytes());
    }

    #[test]
    fn rejects_zero_scalar() {
        let mut blob = v2_blob(b"c", &EccKey::generate(), &EccKey::generate());
        let enc_start = 4 + 4 + 1;
        blob[enc_start..enc_start + 32].fill(0);
        assert!(matches!(
            Device::from_bytes(&blob),
            Err(CdmError::EccKeyParse(_))
        ));
    }

    #[test]
    fn rejects_unknown_version_and_truncation() {
        let mut blob = v2_blob(b"c", &EccKey::generate(), &EccKey::generate());
        blob[3] = 4;
        assert!(matches!(
            Device::from_bytes(&blob),
            Err(CdmError::Format(FormatError::UnsupportedVersion { version: 4, .. }))
        ));

        let blob = v2_blob(b"c", &EccKey::generate(), &EccKey::generate());
        assert!(matches!(
            Device::from_bytes(&blob[..blob.len() - 1]),
            Err(CdmError::Format(FormatError::UnexpectedEof { .. }))
        ));
        assert!(matches!(
            Device::from_base64("!!!"),
            Err(CdmError::InvalidBase64(_))
        ));
    }

    #[test]
    fn debug_hides_private_keys() {
        let device = Device::generate(b"c".to_vec());
        let s = format!("{device:?}");
        let private = hex::encode(device.encryption_key().private_bytes());
        assert!(!s.contains(&private));
    }
}
