use core::fmt;
use core::str::FromStr;

use crate::error::{ContentKeyError, ParseError};
use crate::utils::{bytes_equal, format_uuid, parse_kid};

/**
    DRM content protection system identifier.

    Recognizes the systems this workspace deals with by their DASH-IF
    registered UUIDs. Anything else is captured in `Unknown`.

    Reference: <https://dashif.org/identifiers/content_protection/>
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemId {
    PlayReady,
    ClearKey,
    Widevine,
    Unknown([u8; 16]),
}

impl SystemId {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        use crate::constants::*;
        if bytes_equal(&bytes, &PLAYREADY_SYSTEM_ID) {
            Self::PlayReady
        } else if bytes_equal(&bytes, &CLEARKEY_SYSTEM_ID) {
            Self::ClearKey
        } else if bytes_equal(&bytes, &WIDEVINE_SYSTEM_ID) {
            Self::Widevine
        } else {
            Self::Unknown(bytes)
        }
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        use crate::constants::*;
        match self {
            Self::PlayReady => PLAYREADY_SYSTEM_ID,
            Self::ClearKey => CLEARKEY_SYSTEM_ID,
            Self::Widevine => WIDEVINE_SYSTEM_ID,
            Self::Unknown(bytes) => bytes,
        }
    }

    pub const fn to_name(self) -> &'static str {
        match self {
            Self::PlayReady => "PlayReady",
            Self::ClearKey => "ClearKey",
            Self::Widevine => "Widevine",
            Self::Unknown(_) => "Unknown",
        }
    }

    /**
        Parse a UUID string, hyphenated or plain, case-insensitive.
    */
    pub const fn from_uuid(s: &[u8]) -> Option<Self> {
        match parse_kid(s) {
            Some(bytes) => Some(Self::from_bytes(bytes)),
            None => None,
        }
    }

    pub fn to_uuid(self) -> String {
        format_uuid(&self.to_bytes())
    }

    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.to_name(), self.to_uuid())
    }
}

/**
    Accepts either a system name (`playready`, `clearkey`, `widevine`,
    case-insensitive) or a UUID string.
*/
impl FromStr for SystemId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let by_name = [Self::PlayReady, Self::ClearKey, Self::Widevine]
            .into_iter()
            .find(|id| id.to_name().eq_ignore_ascii_case(trimmed));
        by_name
            .or_else(|| Self::from_uuid(trimmed.as_bytes()))
            .ok_or_else(|| ParseError {
                kind: "system id",
                value: s.to_owned(),
            })
    }
}

/**
    A content decryption key recovered from a license response, normalized
    across key systems.

    The key id is in RFC 4122 byte order. `Display` prints
    `kid_hex:key_hex`, the format most decryption tools accept.
*/
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    kid: [u8; 16],
    key: Vec<u8>,
}

impl ContentKey {
    pub fn new(kid: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> Result<Self, ContentKeyError> {
        let kid_bytes: &[u8] = kid.as_ref();
        let kid: [u8; 16] = kid_bytes
            .try_into()
            .map_err(|_| ContentKeyError::InvalidKidLength(kid_bytes.len()))?;
        let key: &[u8] = key.as_ref();
        if key.is_empty() {
            return Err(ContentKeyError::EmptyKey);
        }
        Ok(Self {
            kid,
            key: key.to_vec(),
        })
    }

    /**
        Infallible constructor for the common AES-128 case.
    */
    pub fn from_aes128(kid: [u8; 16], key: [u8; 16]) -> Self {
        Self {
            kid,
            key: key.to_vec(),
        }
    }

    pub fn kid(&self) -> [u8; 16] {
        self.kid
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn kid_hex(&self) -> String {
        hex::encode(self.kid)
    }

    pub fn key_hex(&self) -> String {
        hex::encode(&self.key)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kid_hex(), self.key_hex())
    }
}

// Keeps key material out of accidental `{:?}` output.
impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentKey")
            .field("kid", &format_uuid(&self.kid))
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .finish()
    }
}

/**
    Parse a content key from `kid_hex:key_hex` format. The key id may be
    written with UUID hyphens.
*/
impl FromStr for ContentKey {
    type Err = ContentKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kid_hex, key_hex) = s.split_once(':').ok_or(ContentKeyError::InvalidFormat)?;
        let kid_hex = kid_hex.trim().replace('-', "");
        let kid = hex::decode(kid_hex).map_err(|e| ContentKeyError::InvalidHex(e.to_string()))?;
        let key =
            hex::decode(key_hex.trim()).map_err(|e| ContentKeyError::InvalidHex(e.to_string()))?;
        Self::new(kid, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn sample_key() -> ContentKey {
        ContentKey::new(
            hex!("00000000000000000000000000000001"),
            hex!("abcdef01abcdef01abcdef01abcdef01"),
        )
        .unwrap()
    }

    #[test]
    fn empty_key_rejected() {
        let err = ContentKey::new([0; 16], []).unwrap_err();
        assert_eq!(err, ContentKeyError::EmptyKey);
    }

    #[test]
    fn invalid_kid_length_rejected() {
        let err = ContentKey::new([0; 15], [1]).unwrap_err();
        assert_eq!(err, ContentKeyError::InvalidKidLength(15));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let key = sample_key();
        let s = key.to_string();
        assert_eq!(
            s,
            "00000000000000000000000000000001:abcdef01abcdef01abcdef01abcdef01"
        );
        assert_eq!(s.parse::<ContentKey>().unwrap(), key);
    }

    #[test]
    fn parse_accepts_hyphenated_kid() {
        let key: ContentKey = "00000000-0000-0000-0000-000000000001 : abcdef01"
            .parse()
            .unwrap();
        assert_eq!(key.kid(), hex!("00000000000000000000000000000001"));
        assert_eq!(key.key(), &hex!("abcdef01"));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "0001".parse::<ContentKey>().unwrap_err(),
            ContentKeyError::InvalidFormat
        );
        assert!(matches!(
            "zz:01".parse::<ContentKey>().unwrap_err(),
            ContentKeyError::InvalidHex(_)
        ));
    }

    #[test]
    fn debug_hides_key_material() {
        let s = format!("{:?}", sample_key());
        assert!(!s.contains("abcdef01"));
        assert!(s.contains("00000000-0000-0000-0000-000000000001"));
    }

    #[test]
    fn system_id_round_trips() {
        for id in [
            SystemId::PlayReady,
            SystemId::ClearKey,
            SystemId::Widevine,
            SystemId::Unknown(hex!("00112233445566778899aabbccddeeff")),
        ] {
            assert_eq!(SystemId::from_bytes(id.to_bytes()), id);
            assert_eq!(SystemId::from_uuid(id.to_uuid().as_bytes()), Some(id));
        }
    }

    #[test]
    fn system_id_display() {
        assert_eq!(
            SystemId::PlayReady.to_string(),
            "PlayReady (9a04f079-9840-4286-ab92-e65be0885f95)"
        );
        assert_eq!(
            SystemId::ClearKey.to_string(),
            "ClearKey (1077efec-c0b2-4d02-ace3-3c1e52e2fb4b)"
        );
    }

    #[test]
    fn system_id_from_str() {
        assert_eq!("playready".parse::<SystemId>(), Ok(SystemId::PlayReady));
        assert_eq!("ClearKey".parse::<SystemId>(), Ok(SystemId::ClearKey));
        assert_eq!(
            "9A04F079-9840-4286-AB92-E65BE0885F95".parse::<SystemId>(),
            Ok(SystemId::PlayReady)
        );
        assert!("fairplay".parse::<SystemId>().is_err());
    }
}
