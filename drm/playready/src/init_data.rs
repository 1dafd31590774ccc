/*!
    Recover WRM header strings from EME init data.

    Pages hand over init data in several historical shapes:

    1. a bare UTF-16LE WRM header
    2. a PlayReady `pssh` box whose payload is a bare UTF-16LE header
    3. a PlayReady `pssh` box whose payload is a PlayReady Header Object
    4. a bare PlayReady Header Object, or a single PRO record

    The cheapest check runs first. Telling shape 4's header object apart
    from a single record relies on the first little-endian u16: a record
    starts with its type (1..=3), a header object with the low half of its
    total length. Short header objects can be misread as records, which is
    accepted for compatibility with what pages send in practice.
*/

use drm_core::{PLAYREADY_SYSTEM_ID, PsshBox, Reader, SystemId};
use drm_playready_format::{
    FormatError,
    pro::{PlayReadyHeader, PlayReadyRecord},
    utf16::decode_utf16le_strict,
};

use crate::error::{CdmError, CdmResult};

const PSSH_PREFIX_LEN: usize = 32;
const MAX_RECORD_TYPE: u16 = 3;

/**
    Extract every WRM header carried by `init_data`, in order.

    Fails with [`CdmError::InitData`] if none can be found.
*/
pub fn extract_wrm_headers(init_data: &[u8]) -> CdmResult<Vec<String>> {
    if let Some(header) = decode_utf16le_strict(init_data) {
        return Ok(vec![header]);
    }

    let headers = if is_playready_box(init_data) {
        let payload = box_payload(init_data);
        match decode_utf16le_strict(&payload) {
            Some(header) => vec![header],
            None => header_object(&payload)?,
        }
    } else {
        let mut r = Reader::new(init_data);
        let is_header_object = r.peek_u16_le().map_err(FormatError::from).map_err(init_data_error)?
            > MAX_RECORD_TYPE;
        if is_header_object {
            header_object(init_data)?
        } else {
            let record = PlayReadyRecord::read(&mut r).map_err(init_data_error)?;
            record.wrm_header_xml().into_iter().collect()
        }
    };

    if headers.is_empty() {
        return Err(CdmError::InitData("no rights management header record".into()));
    }
    Ok(headers)
}

/**
    Like [`extract_wrm_headers`] but returns only the first header.
*/
pub fn extract_wrm_header(init_data: &[u8]) -> CdmResult<String> {
    extract_wrm_headers(init_data)?
        .into_iter()
        .next()
        .ok_or_else(|| CdmError::InitData("no rights management header record".into()))
}

fn is_playready_box(data: &[u8]) -> bool {
    data.len() >= PSSH_PREFIX_LEN
        && data[0] == 0
        && data[1] == 0
        && data[12..28] == PLAYREADY_SYSTEM_ID
}

/*
    A well-formed box is parsed properly so version 1 boxes with key ids
    work. Anything else falls back to the fixed version 0 prefix.
*/
fn box_payload(data: &[u8]) -> Vec<u8> {
    match PsshBox::from_bytes(data) {
        Ok(pssh) if pssh.system_id() == SystemId::PlayReady => pssh.data,
        _ => data[PSSH_PREFIX_LEN..].to_vec(),
    }
}

fn header_object(data: &[u8]) -> CdmResult<Vec<String>> {
    PlayReadyHeader::from_bytes(data)
        .map(|header| header.wrm_headers())
        .map_err(init_data_error)
}

fn init_data_error(e: FormatError) -> CdmError {
    CdmError::InitData(e.to_string())
}
