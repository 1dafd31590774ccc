/*!
    PlayReady Header Object (PRO), the payload of a PlayReady `pssh` box.

    Unlike the surrounding ISO-BMFF framing, every field is little-endian:

    ```text
    u32 LE  total length (including this header)
    u16 LE  record count
    records:
      u16 LE  type (1 = rights management header, 3 = embedded license store)
      u16 LE  length
      [..]    data
    ```
*/

use drm_core::Reader;

use crate::error::FormatResult;
use crate::utf16::{decode_utf16le, encode_utf16le};

pub const RIGHTS_MANAGEMENT_HEADER: u16 = 0x0001;
pub const EMBEDDED_LICENSE_STORE: u16 = 0x0003;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayReadyRecord {
    pub record_type: u16,
    pub data: Vec<u8>,
}

impl PlayReadyRecord {
    /**
        Build a rights management record holding a WRM header string.
    */
    pub fn wrm_header(xml: &str) -> Self {
        Self {
            record_type: RIGHTS_MANAGEMENT_HEADER,
            data: encode_utf16le(xml),
        }
    }

    pub fn read(r: &mut Reader<'_>) -> FormatResult<Self> {
        let record_type = r.read_u16_le()?;
        let len = r.read_u16_le()? as usize;
        Ok(Self {
            record_type,
            data: r.read_bytes(len)?.to_vec(),
        })
    }

    /**
        The WRM header XML for type 1 records. `None` for other types or
        data that is not valid UTF-16LE.
    */
    pub fn wrm_header_xml(&self) -> Option<String> {
        if self.record_type != RIGHTS_MANAGEMENT_HEADER {
            return None;
        }
        decode_utf16le(&self.data).ok()
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.record_type.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.data);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayReadyHeader {
    pub records: Vec<PlayReadyRecord>,
}

impl PlayReadyHeader {
    pub fn new(records: Vec<PlayReadyRecord>) -> Self {
        Self { records }
    }

    /**
        Parse a record list. The declared total length is informational and
        not checked; the record count drives the walk.
    */
    pub fn from_bytes(data: &[u8]) -> FormatResult<Self> {
        let mut r = Reader::new(data);
        Self::read(&mut r)
    }

    pub fn read(r: &mut Reader<'_>) -> FormatResult<Self> {
        let _length = r.read_u32_le()?;
        let count = r.read_u16_le()?;
        let mut records = Vec::with_capacity(count.into());
        for _ in 0..count {
            records.push(PlayReadyRecord::read(r)?);
        }
        Ok(Self { records })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for record in &self.records {
            record.write(&mut body);
        }
        let mut out = Vec::with_capacity(6 + body.len());
        out.extend_from_slice(&((6 + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&(self.records.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /**
        All WRM header strings carried by this object, in record order.
    */
    pub fn wrm_headers(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(PlayReadyRecord::wrm_header_xml)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    #[test]
    fn round_trip_with_mixed_records() {
        let header = PlayReadyHeader::new(vec![
            PlayReadyRecord {
                record_type: EMBEDDED_LICENSE_STORE,
                data: vec![0; 10],
            },
            PlayReadyRecord::wrm_header("<WRMHEADER/>"),
        ]);
        let bytes = header.to_bytes();
        assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize, bytes.len());
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 2);

        let parsed = PlayReadyHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.wrm_headers(), vec!["<WRMHEADER/>".to_string()]);
    }

    #[test]
    fn truncated_record_is_an_error() {
        let bytes = PlayReadyHeader::new(vec![PlayReadyRecord::wrm_header("<WRMHEADER/>")]).to_bytes();
        let err = PlayReadyHeader::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }
}
