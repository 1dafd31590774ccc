/*!
    XMR (eXtensible Media Rights) binary license format.

    All integers are big-endian.

    ```text
    [4]   signature ("XMR\0")
    u32   version
    [16]  rights id
    then records until the end of the buffer:
      u16   flags
      u16   type
      u32   length (including this 8-byte header)
      [..]  payload, length - 8 bytes
    ```

    Records whose flags are 0 or 1 are leaves and carry a payload. Any other
    flag value marks a container: its header is consumed and its children
    follow as ordinary records in the same walk, so the record list is the
    flattened object tree.
*/

use drm_core::Reader;

use crate::error::{FormatError, FormatResult};
use crate::key::{CipherType, KeyType};

pub const XMR_MAGIC: &[u8; 4] = b"XMR\0";

const HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: u32 = 8;

/**
    Record type codes with a typed payload.
*/
pub mod object_type {
    pub const CONTENT_KEY: u16 = 0x000A;
    pub const SIGNATURE: u16 = 0x000B;
    pub const ECC_KEY: u16 = 0x002A;
    pub const AUXILIARY_KEYS: u16 = 0x0051;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKeyObject {
    /**
        Key id in the on-wire mixed-endian GUID layout.
    */
    pub key_id: [u8; 16],
    pub key_type: KeyType,
    pub cipher_type: CipherType,
    pub encrypted_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureObject {
    pub signature_type: u16,
    pub signature_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryKey {
    pub location: u32,
    pub key: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryKeysObject {
    pub keys: Vec<AuxiliaryKey>,
}

/**
    The device encryption public key the license was issued to.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EccKeyObject {
    pub curve_type: u16,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    ContentKey(ContentKeyObject),
    Signature(SignatureObject),
    AuxiliaryKeys(AuxiliaryKeysObject),
    EccKey(EccKeyObject),
    /**
        Children follow as subsequent records.
    */
    Container,
    /**
        Leaf record of a type this crate does not interpret.
    */
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmrRecord {
    /**
        Offset of the record header from the start of the license.
    */
    pub offset: usize,
    pub flags: u16,
    pub record_type: u16,
    pub length: u32,
    pub payload: RecordPayload,
}

/**
    A parsed XMR license. The raw bytes are kept because integrity
    verification runs over them.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmrLicense {
    pub signature: [u8; 4],
    pub version: u32,
    pub rights_id: [u8; 16],
    pub records: Vec<XmrRecord>,
    raw: Vec<u8>,
}

impl XmrLicense {
    pub fn from_bytes(data: &[u8]) -> FormatResult<Self> {
        let mut r = Reader::new(data);
        let signature = r.read_array()?;
        let version = r.read_u32_be()?;
        let rights_id = r.read_array()?;
        debug_assert_eq!(r.position(), HEADER_LEN);

        let mut records = Vec::new();
        while !r.is_empty() {
            records.push(read_record(&mut r)?);
        }

        Ok(Self {
            signature,
            version,
            rights_id,
            records,
            raw: data.to_vec(),
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn records_of_type(&self, record_type: u16) -> impl Iterator<Item = &XmrRecord> {
        self.records
            .iter()
            .filter(move |rec| rec.record_type == record_type)
    }

    pub fn content_keys(&self) -> impl Iterator<Item = &ContentKeyObject> {
        self.records.iter().filter_map(|rec| match &rec.payload {
            RecordPayload::ContentKey(ck) => Some(ck),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&SignatureObject> {
        self.signature_record().and_then(|rec| match &rec.payload {
            RecordPayload::Signature(sig) => Some(sig),
            _ => None,
        })
    }

    pub fn auxiliary_keys(&self) -> Option<&AuxiliaryKeysObject> {
        self.records.iter().find_map(|rec| match &rec.payload {
            RecordPayload::AuxiliaryKeys(aux) => Some(aux),
            _ => None,
        })
    }

    pub fn ecc_key(&self) -> Option<&EccKeyObject> {
        self.records.iter().find_map(|rec| match &rec.payload {
            RecordPayload::EccKey(key) => Some(key),
            _ => None,
        })
    }

    /**
        Scalable licenses are recognized by the presence of an auxiliary
        keys record, whether or not it decoded to a typed payload.
    */
    pub fn is_scalable(&self) -> bool {
        self.records_of_type(object_type::AUXILIARY_KEYS)
            .next()
            .is_some()
    }

    /**
        The bytes covered by the license MAC: everything before the
        signature record.
    */
    pub fn signed_bytes(&self) -> Option<&[u8]> {
        self.signature_record().map(|rec| &self.raw[..rec.offset])
    }

    fn signature_record(&self) -> Option<&XmrRecord> {
        self.records.iter().find(|rec| {
            rec.record_type == object_type::SIGNATURE
                && matches!(rec.payload, RecordPayload::Signature(_))
        })
    }
}

fn read_record(r: &mut Reader<'_>) -> FormatResult<XmrRecord> {
    let offset = r.position();
    let flags = r.read_u16_be()?;
    let record_type = r.read_u16_be()?;
    let length = r.read_u32_be()?;

    if length < RECORD_HEADER_LEN {
        return Err(FormatError::InvalidRecordLength { offset, length });
    }
    let body_len = (length - RECORD_HEADER_LEN) as usize;
    if body_len > r.remaining() {
        return Err(FormatError::RecordOverrun {
            offset,
            length,
            remaining: r.remaining(),
        });
    }

    let payload = if flags == 0 || flags == 1 {
        let body = r.read_bytes(body_len)?;
        decode_payload(record_type, body)?
    } else {
        RecordPayload::Container
    };

    Ok(XmrRecord {
        offset,
        flags,
        record_type,
        length,
        payload,
    })
}

fn decode_payload(record_type: u16, body: &[u8]) -> FormatResult<RecordPayload> {
    let mut r = Reader::new(body);
    let payload = match record_type {
        object_type::CONTENT_KEY => {
            let key_id = r.read_array()?;
            let key_type = KeyType::from_u16(r.read_u16_be()?);
            let cipher_type = CipherType::from_u16(r.read_u16_be()?);
            let key_len = r.read_u16_be()? as usize;
            RecordPayload::ContentKey(ContentKeyObject {
                key_id,
                key_type,
                cipher_type,
                encrypted_key: r.read_bytes(key_len)?.to_vec(),
            })
        }
        object_type::SIGNATURE => {
            let signature_type = r.read_u16_be()?;
            let len = r.read_u16_be()? as usize;
            RecordPayload::Signature(SignatureObject {
                signature_type,
                signature_data: r.read_bytes(len)?.to_vec(),
            })
        }
        object_type::AUXILIARY_KEYS => {
            let count = r.read_u16_be()?;
            let mut keys = Vec::with_capacity(count.into());
            for _ in 0..count {
                keys.push(AuxiliaryKey {
                    location: r.read_u32_be()?,
                    key: r.read_array()?,
                });
            }
            RecordPayload::AuxiliaryKeys(AuxiliaryKeysObject { keys })
        }
        object_type::ECC_KEY => {
            let curve_type = r.read_u16_be()?;
            let len = r.read_u16_be()? as usize;
            RecordPayload::EccKey(EccKeyObject {
                curve_type,
                key: r.read_bytes(len)?.to_vec(),
            })
        }
        _ => RecordPayload::Opaque(body.to_vec()),
    };
    Ok(payload)
}
