use crate::error::PsshError;
use crate::reader::Reader;
use crate::types::SystemId;

const BOX_TYPE: &[u8; 4] = b"pssh";

/**
    Parsed ISO-BMFF `pssh` box.

    Layout, all integers big-endian:

    ```text
    u32  box_size       total size including this field
    [4]  box_type       "pssh"
    u8   version        0 or 1
    [3]  flags
    [16] system_id
    v1:  u32 kid_count, kid_count * [16] key ids
    u32  data_size
    [..] data           system-specific payload
    ```

    For PlayReady the payload is a PlayReady Header Object.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub system_id: [u8; 16],
    /**
        Key ids from the box header. Always empty for v0 boxes.
    */
    pub key_ids: Vec<[u8; 16]>,
    pub data: Vec<u8>,
}

impl PsshBox {
    /**
        Wrap a payload in a v0 box for the given system.
    */
    pub fn new(system_id: SystemId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            version: 0,
            flags: [0; 3],
            system_id: system_id.to_bytes(),
            key_ids: Vec::new(),
            data: data.into(),
        }
    }

    pub fn from_base64(pssh: &str) -> Result<Self, PsshError> {
        let bytes = data_encoding::BASE64
            .decode(pssh.trim().as_bytes())
            .map_err(|e| PsshError::InvalidBase64(format!("PSSH: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /**
        Parse a complete box. Bytes past `box_size` are ignored, but the
        box itself must be consumed exactly.
    */
    pub fn from_bytes(input: &[u8]) -> Result<Self, PsshError> {
        let mut outer = Reader::new(input);
        let box_size = outer.read_u32_be()? as usize;
        if box_size < 8 {
            return Err(malformed(format!("box_size {box_size} is too small")));
        }
        outer.reset();
        let mut r = Reader::new(outer.read_bytes(box_size)?);
        r.skip(4)?;

        if r.read_array::<4>()? != *BOX_TYPE {
            return Err(malformed("box_type is not 'pssh'".into()));
        }

        let version = r.read_u8()?;
        if version > 1 {
            return Err(malformed(format!("unsupported version {version}")));
        }
        let flags = r.read_array()?;
        let system_id = r.read_array()?;

        let mut key_ids = Vec::new();
        if version == 1 {
            let kid_count = r.read_u32_be()?;
            for _ in 0..kid_count {
                key_ids.push(r.read_array()?);
            }
        }

        let data_size = r.read_u32_be()? as usize;
        let data = r.read_bytes(data_size)?.to_vec();

        if !r.is_empty() {
            return Err(malformed(format!(
                "trailing bytes: consumed {}, box_size {box_size}",
                r.position()
            )));
        }

        Ok(PsshBox {
            version,
            flags,
            system_id,
            key_ids,
            data,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut size = 32 + self.data.len();
        if self.version == 1 {
            size += 4 + self.key_ids.len() * 16;
        }

        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&(size as u32).to_be_bytes());
        buf.extend_from_slice(BOX_TYPE);
        buf.push(self.version);
        buf.extend_from_slice(&self.flags);
        buf.extend_from_slice(&self.system_id);
        if self.version == 1 {
            buf.extend_from_slice(&(self.key_ids.len() as u32).to_be_bytes());
            for kid in &self.key_ids {
                buf.extend_from_slice(kid);
            }
        }
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn to_base64(&self) -> String {
        data_encoding::BASE64.encode(&self.to_bytes())
    }

    pub fn system_id(&self) -> SystemId {
        SystemId::from_bytes(self.system_id)
    }

    pub fn ensure_system_id(&self, expected: SystemId) -> Result<(), PsshError> {
        let actual = self.system_id();
        if actual == expected {
            Ok(())
        } else {
            Err(PsshError::SystemIdMismatch(actual, expected))
        }
    }
}

fn malformed(msg: String) -> PsshError {
    PsshError::Malformed(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    use crate::constants::PLAYREADY_SYSTEM_ID;

    #[test]
    fn v0_round_trip() {
        let pssh = PsshBox::new(SystemId::PlayReady, b"payload".to_vec());
        let raw = pssh.to_bytes();
        assert_eq!(raw.len(), 32 + 7);
        assert_eq!(&raw[12..28], &PLAYREADY_SYSTEM_ID);
        assert_eq!(PsshBox::from_bytes(&raw).unwrap(), pssh);
    }

    #[test]
    fn v1_keeps_header_key_ids() {
        let kid1 = hex!("00000000000000000000000000000001");
        let kid2 = hex!("00000000000000000000000000000002");
        let pssh = PsshBox {
            version: 1,
            flags: [0; 3],
            system_id: PLAYREADY_SYSTEM_ID,
            key_ids: vec![kid1, kid2],
            data: b"data".to_vec(),
        };
        let raw = pssh.to_bytes();
        let parsed = PsshBox::from_bytes(&raw).unwrap();
        assert_eq!(parsed.key_ids, vec![kid1, kid2]);
        assert_eq!(parsed.to_bytes(), raw);
    }

    #[test]
    fn base64_round_trip() {
        let pssh = PsshBox::new(SystemId::ClearKey, b"hello".to_vec());
        assert_eq!(PsshBox::from_base64(&pssh.to_base64()).unwrap(), pssh);
    }

    #[test]
    fn unknown_system_id_accepted() {
        let mut raw = PsshBox::new(SystemId::PlayReady, b"x".to_vec()).to_bytes();
        raw[12] = 0xFF;
        let pssh = PsshBox::from_bytes(&raw).unwrap();
        assert!(pssh.system_id().is_unknown());
        assert!(matches!(
            pssh.ensure_system_id(SystemId::PlayReady),
            Err(PsshError::SystemIdMismatch(_, _))
        ));
    }

    #[test]
    fn rejects_wrong_box_type_and_version() {
        let mut raw = PsshBox::new(SystemId::PlayReady, b"x".to_vec()).to_bytes();
        raw[4..8].copy_from_slice(b"moof");
        assert!(matches!(
            PsshBox::from_bytes(&raw),
            Err(PsshError::Malformed(_))
        ));

        let mut raw = PsshBox::new(SystemId::PlayReady, b"x".to_vec()).to_bytes();
        raw[8] = 2;
        assert!(matches!(
            PsshBox::from_bytes(&raw),
            Err(PsshError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(
            PsshBox::from_bytes(&[0u8; 2]),
            Err(PsshError::Truncated(_))
        ));
        let raw = PsshBox::new(SystemId::PlayReady, b"payload".to_vec()).to_bytes();
        assert!(PsshBox::from_bytes(&raw[..raw.len() - 1]).is_err());
    }

    #[test]
    fn rejects_data_size_mismatch() {
        let mut raw = PsshBox::new(SystemId::PlayReady, b"payload".to_vec()).to_bytes();
        raw[31] = 3;
        assert!(matches!(
            PsshBox::from_bytes(&raw),
            Err(PsshError::Malformed(_))
        ));
    }
}
