use thiserror::Error;

use drm_core::ReadError;

/**
    Errors from decoding PlayReady wire formats.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unexpected end of data: needed {needed} bytes, have {have}")]
    UnexpectedEof { needed: usize, have: usize },

    #[error("unsupported {format} version {version}")]
    UnsupportedVersion { format: &'static str, version: u32 },

    #[error("XMR record at offset {offset} declares invalid length {length}")]
    InvalidRecordLength { offset: usize, length: u32 },

    #[error("XMR record at offset {offset} declares length {length}, only {remaining} bytes remain")]
    RecordOverrun {
        offset: usize,
        length: u32,
        remaining: usize,
    },

    #[error("invalid UTF-16LE text")]
    InvalidUtf16,

    #[error("invalid XML: {0}")]
    InvalidXml(String),

    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("invalid base64 in {field}: {message}")]
    InvalidBase64 {
        field: &'static str,
        message: String,
    },
}

impl From<ReadError> for FormatError {
    fn from(e: ReadError) -> Self {
        Self::UnexpectedEof {
            needed: e.offset + e.needed,
            have: e.offset + e.remaining,
        }
    }
}

impl From<quick_xml::Error> for FormatError {
    fn from(e: quick_xml::Error) -> Self {
        Self::InvalidXml(e.to_string())
    }
}

pub type FormatResult<T> = Result<T, FormatError>;
