/*!
    WRM (Windows Rights Management) header XML.

    The content-identifying document a license request is built around.
    Versions 4.0 through 4.3 are in use:

    - 4.0: `<DATA><KID>base64</KID><LA_URL>..</LA_URL>..</DATA>`
    - 4.1: `<DATA><PROTECTINFO><KID VALUE="base64" ALGID=".."/></PROTECTINFO>..</DATA>`
    - 4.2, 4.3: `<PROTECTINFO><KIDS><KID VALUE=".." ALGID=".."/>..</KIDS></PROTECTINFO>`

    Key ids are base64-encoded GUIDs in little-endian layout.
*/

use core::fmt;

use data_encoding::BASE64_NOPAD;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use drm_core::swap_guid_bytes;

use crate::error::{FormatError, FormatResult};
use crate::soap::local_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrmHeaderVersion {
    V4_0_0_0,
    V4_1_0_0,
    V4_2_0_0,
    V4_3_0_0,
    Unknown(String),
}

impl WrmHeaderVersion {
    pub fn from_attribute(value: &str) -> Self {
        match value.trim() {
            "4.0.0.0" => Self::V4_0_0_0,
            "4.1.0.0" => Self::V4_1_0_0,
            "4.2.0.0" => Self::V4_2_0_0,
            "4.3.0.0" => Self::V4_3_0_0,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::V4_0_0_0 => "4.0.0.0",
            Self::V4_1_0_0 => "4.1.0.0",
            Self::V4_2_0_0 => "4.2.0.0",
            Self::V4_3_0_0 => "4.3.0.0",
            Self::Unknown(s) => s,
        }
    }

    /**
        License protocol version a request for this header must announce.
        Anything unrecognized falls back to 1.
    */
    pub fn protocol_version(&self) -> u32 {
        match self {
            Self::V4_3_0_0 => 5,
            Self::V4_2_0_0 => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for WrmHeaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    A key id listed in the header.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrmKid {
    /**
        RFC 4122 byte order.
    */
    pub kid: [u8; 16],
    pub algorithm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrmHeader {
    pub version: WrmHeaderVersion,
    pub kids: Vec<WrmKid>,
    pub la_url: Option<String>,
    pub lui_url: Option<String>,
    pub ds_id: Option<String>,
    /**
        KID values that are not 16 bytes of base64. Kept out of `kids`
        rather than failing the whole header.
    */
    pub invalid_kids: Vec<String>,
    /**
        The document as received. Challenges embed it verbatim.
    */
    pub xml: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextField {
    Kid,
    AlgId,
    LaUrl,
    LuiUrl,
    DsId,
}

impl WrmHeader {
    pub fn from_xml(xml: &str) -> FormatResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut header = Self {
            version: WrmHeaderVersion::Unknown(String::new()),
            kids: Vec::new(),
            la_url: None,
            lui_url: None,
            ds_id: None,
            invalid_kids: Vec::new(),
            xml: xml.to_string(),
        };
        let mut seen_root = false;
        let mut field: Option<TextField> = None;
        let mut legacy_algorithm: Option<String> = None;

        loop {
            let event = reader.read_event()?;
            let (start, is_empty) = match &event {
                Event::Start(e) => (Some(e), false),
                Event::Empty(e) => (Some(e), true),
                _ => (None, false),
            };

            if let Some(e) = start {
                let name = e.name();
                let local = local_name(name.as_ref());
                if !seen_root {
                    if local != b"WRMHEADER" {
                        return Err(FormatError::MissingElement("WRMHEADER"));
                    }
                    seen_root = true;
                    if let Some(version) = attribute(e, "version")? {
                        header.version = WrmHeaderVersion::from_attribute(&version);
                    }
                    continue;
                }
                match local {
                    b"KID" => {
                        if let Some(value) = attribute(e, "VALUE")? {
                            let algorithm = attribute(e, "ALGID")?;
                            header.push_kid(value, algorithm);
                        } else if !is_empty {
                            field = Some(TextField::Kid);
                        }
                    }
                    b"ALGID" if !is_empty => field = Some(TextField::AlgId),
                    b"LA_URL" if !is_empty => field = Some(TextField::LaUrl),
                    b"LUI_URL" if !is_empty => field = Some(TextField::LuiUrl),
                    b"DS_ID" if !is_empty => field = Some(TextField::DsId),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Text(t) => {
                    let Some(current) = field else { continue };
                    let text = t
                        .unescape()
                        .map_err(|e| FormatError::InvalidXml(e.to_string()))?
                        .into_owned();
                    match current {
                        TextField::Kid => header.push_kid(text, None),
                        TextField::AlgId => legacy_algorithm = Some(text),
                        TextField::LaUrl => header.la_url = Some(text),
                        TextField::LuiUrl => header.lui_url = Some(text),
                        TextField::DsId => header.ds_id = Some(text),
                    }
                }
                Event::End(_) => field = None,
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(FormatError::MissingElement("WRMHEADER"));
        }

        // 4.0 headers carry a single ALGID element next to the KID.
        if let Some(alg) = legacy_algorithm {
            for kid in header.kids.iter_mut().filter(|k| k.algorithm.is_none()) {
                kid.algorithm = Some(alg.clone());
            }
        }

        Ok(header)
    }

    pub fn protocol_version(&self) -> u32 {
        self.version.protocol_version()
    }

    fn push_kid(&mut self, value: String, algorithm: Option<String>) {
        match decode_kid(&value) {
            Some(kid) => self.kids.push(WrmKid { kid, algorithm }),
            None => self.invalid_kids.push(value),
        }
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> FormatResult<Option<String>> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| FormatError::InvalidXml(err.to_string()))?;
    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|err| FormatError::InvalidXml(err.to_string()))
    })
    .transpose()
}

/**
    Decode a base64 GUID, padded or not. `None` unless it is exactly
    16 bytes.
*/
fn decode_kid(value: &str) -> Option<[u8; 16]> {
    let trimmed = value.trim().trim_end_matches('=');
    let bytes = BASE64_NOPAD.decode(trimmed.as_bytes()).ok()?;
    let guid: [u8; 16] = bytes.as_slice().try_into().ok()?;
    Some(kid_to_uuid(&guid))
}

/**
    Convert a PlayReady little-endian GUID to RFC 4122 byte order.
*/
pub fn kid_to_uuid(guid: &[u8; 16]) -> [u8; 16] {
    swap_guid_bytes(*guid)
}
