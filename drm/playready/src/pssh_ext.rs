/*!
    PlayReady extension trait for `PsshBox`.

    `PlayReadyExt` adds PlayReady-specific accessors to `drm_core::PsshBox`:
    - WRM header XML strings carried by the payload
    - Parsed WRM headers
    - Key ids from those headers, in UUID byte order
*/

use drm_core::{PsshBox, SystemId};
use drm_playready_format::wrm_header::WrmHeader;

use crate::error::{CdmError, CdmResult};
use crate::init_data::extract_wrm_headers;

pub trait PlayReadyExt {
    /**
        WRM header XML strings from the box payload. The payload may be a
        PlayReady Header Object or a bare UTF-16LE header.
    */
    fn playready_wrm_headers(&self) -> CdmResult<Vec<String>>;

    /**
        The first WRM header, parsed.
    */
    fn playready_wrm_header(&self) -> CdmResult<WrmHeader>;

    /**
        Key ids from all WRM headers, in UUID byte order, deduplicated.
    */
    fn playready_key_ids(&self) -> CdmResult<Vec<[u8; 16]>>;
}

impl PlayReadyExt for PsshBox {
    fn playready_wrm_headers(&self) -> CdmResult<Vec<String>> {
        self.ensure_system_id(SystemId::PlayReady)?;
        extract_wrm_headers(&self.data)
    }

    fn playready_wrm_header(&self) -> CdmResult<WrmHeader> {
        let xml = self
            .playready_wrm_headers()?
            .into_iter()
            .next()
            .ok_or_else(|| CdmError::InitData("no WRM header in PSSH".into()))?;
        WrmHeader::from_xml(&xml).map_err(CdmError::InvalidHeader)
    }

    fn playready_key_ids(&self) -> CdmResult<Vec<[u8; 16]>> {
        let mut kids = Vec::new();
        for xml in self.playready_wrm_headers()? {
            let header = WrmHeader::from_xml(&xml).map_err(CdmError::InvalidHeader)?;
            for kid in header.kids {
                if !kids.contains(&kid.kid) {
                    kids.push(kid.kid);
                }
            }
        }
        Ok(kids)
    }
}
