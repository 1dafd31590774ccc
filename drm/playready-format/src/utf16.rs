/*!
    UTF-16LE helpers. PlayReady stores every header string as UTF-16LE.
*/

use crate::error::{FormatError, FormatResult};

/**
    Decode bytes as UTF-16LE only if they unambiguously look like text:
    non-empty, even length, and every high byte zero.

    Used to tell a bare header string apart from binary framing, where a
    lenient decoder would happily accept almost anything.
*/
pub fn decode_utf16le_strict(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return None;
    }
    if bytes.iter().skip(1).step_by(2).any(|&b| b != 0) {
        return None;
    }
    decode_utf16le(bytes).ok()
}

/**
    Decode any well-formed UTF-16LE. A trailing odd byte or an unpaired
    surrogate is an error.
*/
pub fn decode_utf16le(bytes: &[u8]) -> FormatResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(FormatError::InvalidUtf16);
    }
    let units = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| FormatError::InvalidUtf16)
}

pub fn encode_utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
