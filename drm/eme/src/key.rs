use core::fmt;

use drm_core::{ContentKey, ContentKeyError, format_uuid};
use drm_playready::RecoveredKey;
use drm_playready::format::key::{CipherType, KeyType};

/**
    A key recovered by a completed session.

    PlayReady keys keep the key and cipher types from their license
    record. ClearKey licenses carry neither, so both are `None` there.
*/
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    /// RFC 4122 byte order
    pub kid: [u8; 16],
    pub key_type: Option<KeyType>,
    pub cipher_type: Option<CipherType>,
    pub key: Vec<u8>,
}

impl SessionKey {
    pub fn to_content_key(&self) -> Result<ContentKey, ContentKeyError> {
        ContentKey::new(self.kid, &self.key)
    }
}

impl From<&RecoveredKey> for SessionKey {
    fn from(key: &RecoveredKey) -> Self {
        Self {
            kid: key.kid,
            key_type: Some(key.key_type),
            cipher_type: Some(key.cipher_type),
            key: key.key.to_vec(),
        }
    }
}

impl From<ContentKey> for SessionKey {
    fn from(key: ContentKey) -> Self {
        Self {
            kid: key.kid(),
            key_type: None,
            cipher_type: None,
            key: key.key().to_vec(),
        }
    }
}

/**
    `kid_hex:key_hex`, like [`ContentKey`].
*/
impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.kid), hex::encode(&self.key))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("kid", &format_uuid(&self.kid))
            .field("key_type", &self.key_type)
            .field("cipher_type", &self.cipher_type)
            .finish_non_exhaustive()
    }
}
