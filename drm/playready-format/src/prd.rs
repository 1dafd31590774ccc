/*!
    PRD (PlayReady Device) file format.

    ```text
    [3]  magic "PRD" (not checked on load)
    u8   version

    version 2:
      u32 BE  certificate_length
      [..]    certificate chain
      [96]    encryption key
      [96]    signing key

    version 3:
      [96]    group key
      [96]    encryption key
      [96]    signing key
      u32 BE  certificate_length
      [..]    certificate chain
    ```

    Each 96-byte key is a private scalar (32 bytes, big-endian) followed by
    the public point X || Y. Only the scalar is authoritative; the public
    half is derivable and carried for convenience.
*/

use drm_core::Reader;

use crate::error::{FormatError, FormatResult};

pub const PRD_MAGIC: &[u8; 3] = b"PRD";

/**
    ECC P-256 key as stored in PRD files.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEccKey {
    pub private_key: [u8; 32],
    pub public_key: [u8; 64],
}

impl RawEccKey {
    pub const LEN: usize = 96;

    fn read(r: &mut Reader<'_>) -> FormatResult<Self> {
        Ok(Self {
            private_key: r.read_array()?,
            public_key: r.read_array()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 96] {
        let mut buf = [0u8; 96];
        buf[..32].copy_from_slice(&self.private_key);
        buf[32..].copy_from_slice(&self.public_key);
        buf
    }
}

/**
    Parsed PRD device file.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrdFile {
    pub version: u8,
    /**
        Only present in version 3 files.
    */
    pub group_key: Option<RawEccKey>,
    pub encryption_key: RawEccKey,
    pub signing_key: RawEccKey,
    pub certificate_chain: Vec<u8>,
}

impl PrdFile {
    pub fn from_bytes(data: &[u8]) -> FormatResult<Self> {
        let mut r = Reader::new(data);
        r.skip(PRD_MAGIC.len())?;
        let version = r.read_u8()?;

        match version {
            2 => {
                let certificate_chain = read_certificate(&mut r)?;
                let encryption_key = RawEccKey::read(&mut r)?;
                let signing_key = RawEccKey::read(&mut r)?;
                Ok(Self {
                    version,
                    group_key: None,
                    encryption_key,
                    signing_key,
                    certificate_chain,
                })
            }
            3 => {
                let group_key = RawEccKey::read(&mut r)?;
                let encryption_key = RawEccKey::read(&mut r)?;
                let signing_key = RawEccKey::read(&mut r)?;
                let certificate_chain = read_certificate(&mut r)?;
                Ok(Self {
                    version,
                    group_key: Some(group_key),
                    encryption_key,
                    signing_key,
                    certificate_chain,
                })
            }
            _ => Err(FormatError::UnsupportedVersion {
                format: "PRD",
                version: version.into(),
            }),
        }
    }

    /**
        Serialize as a version 3 file. A missing group key is written as
        zeros.
    */
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 3 * RawEccKey::LEN + 4 + self.certificate_chain.len());
        buf.extend_from_slice(PRD_MAGIC);
        buf.push(3);
        match &self.group_key {
            Some(k) => buf.extend_from_slice(&k.to_bytes()),
            None => buf.extend_from_slice(&[0u8; RawEccKey::LEN]),
        }
        buf.extend_from_slice(&self.encryption_key.to_bytes());
        buf.extend_from_slice(&self.signing_key.to_bytes());
        buf.extend_from_slice(&(self.certificate_chain.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.certificate_chain);
        buf
    }
}

fn read_certificate(r: &mut Reader<'_>) -> FormatResult<Vec<u8>> {
    let len = r.read_u32_be()? as usize;
    Ok(r.read_bytes(len)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_bytes(fill: u8) -> [u8; 96] {
        let mut k = [fill; 96];
        k[32..].fill(fill.wrapping_add(1));
        k
    }

    fn make_v3(cert: &[u8]) -> Vec<u8> {
        let mut buf = b"PRD\x03".to_vec();
        buf.extend_from_slice(&key_bytes(0xA0));
        buf.extend_from_slice(&key_bytes(0xB0));
        buf.extend_from_slice(&key_bytes(0xC0));
        buf.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        buf.extend_from_slice(cert);
        buf
    }

    fn make_v2(cert: &[u8]) -> Vec<u8> {
        let mut buf = b"PRD\x02".to_vec();
        buf.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        buf.extend_from_slice(cert);
        buf.extend_from_slice(&key_bytes(0xB0));
        buf.extend_from_slice(&key_bytes(0xC0));
        buf
    }

    #[test]
    fn parse_v3() {
        let data = make_v3(b"certificate-chain");
        let prd = PrdFile::from_bytes(&data).unwrap();
        assert_eq!(prd.version, 3);
        assert_eq!(prd.group_key.as_ref().unwrap().private_key, [0xA0; 32]);
        assert_eq!(prd.encryption_key.private_key, [0xB0; 32]);
        assert_eq!(prd.encryption_key.public_key, [0xB1; 64]);
        assert_eq!(prd.signing_key.private_key, [0xC0; 32]);
        assert_eq!(prd.certificate_chain, b"certificate-chain");
        assert_eq!(prd.to_bytes(), data);
    }

    #[test]
    fn parse_v2_and_upgrade() {
        let prd = PrdFile::from_bytes(&make_v2(b"v2-cert")).unwrap();
        assert_eq!(prd.version, 2);
        assert!(prd.group_key.is_none());
        assert_eq!(prd.certificate_chain, b"v2-cert");

        let upgraded = PrdFile::from_bytes(&prd.to_bytes()).unwrap();
        assert_eq!(upgraded.version, 3);
        assert_eq!(upgraded.group_key.unwrap().private_key, [0; 32]);
        assert_eq!(upgraded.encryption_key, prd.encryption_key);
        assert_eq!(upgraded.signing_key, prd.signing_key);
        assert_eq!(upgraded.certificate_chain, prd.certificate_chain);
    }

    #[test]
    fn magic_is_not_checked() {
        let mut data = make_v3(b"c");
        data[..3].copy_from_slice(b"\0\0\0");
        assert!(PrdFile::from_bytes(&data).is_ok());
    }

    #[test]
    fn unsupported_version() {
        let err = PrdFile::from_bytes(b"PRD\x01rest").unwrap_err();
        assert_eq!(
            err,
            FormatError::UnsupportedVersion {
                format: "PRD",
                version: 1
            }
        );
    }

    #[test]
    fn truncated() {
        let data = make_v3(b"certificate");
        for len in [0, 3, 4, 100, data.len() - 1] {
            let err = PrdFile::from_bytes(&data[..len]).unwrap_err();
            assert!(matches!(err, FormatError::UnexpectedEof { .. }), "len {len}");
        }
    }
}
