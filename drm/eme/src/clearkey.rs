/*!
    W3C ClearKey messages.

    ClearKey needs no CDM: the license request lists key ids and the
    response carries the keys as JSON Web Keys. Recovered PlayReady keys
    are handed back to pages in the same shape.
*/

use data_encoding::BASE64URL_NOPAD;
use serde::{Deserialize, Serialize};
use tracing::warn;

use drm_core::{ContentKey, PsshBox, SystemId};

use crate::error::{EmeError, EmeResult};
use crate::key::SessionKey;
use crate::system::{KeySystem, PendingChallenge};

const SESSION_TYPE: &str = "temporary";

#[derive(Debug, Serialize, Deserialize)]
struct JsonWebKeySet {
    keys: Vec<JsonWebKey>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    session_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonWebKey {
    kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    kid: String,
    k: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LicenseRequest {
    kids: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    session_type: Option<String>,
}

fn decode_b64url(field: &str, value: &str) -> EmeResult<Vec<u8>> {
    // Some servers pad anyway.
    BASE64URL_NOPAD
        .decode(value.trim().trim_end_matches('=').as_bytes())
        .map_err(|e| EmeError::ClearKey(format!("{field}: {e}")))
}

/**
    Parse a ClearKey license (a JSON Web Key Set).

    Keys with a `kty` other than `oct` are skipped.
*/
pub fn parse_response(json: &[u8]) -> EmeResult<Vec<ContentKey>> {
    let set: JsonWebKeySet =
        serde_json::from_slice(json).map_err(|e| EmeError::ClearKey(e.to_string()))?;

    let mut keys = Vec::with_capacity(set.keys.len());
    for jwk in set.keys {
        if jwk.kty != "oct" {
            warn!(kty = %jwk.kty, "skipping non-symmetric JSON Web Key");
            continue;
        }
        let kid = decode_b64url("kid", &jwk.kid)?;
        let key = decode_b64url("k", &jwk.k)?;
        keys.push(ContentKey::new(kid, key).map_err(|e| EmeError::ClearKey(e.to_string()))?);
    }
    Ok(keys)
}

/**
    Serialize keys as a ClearKey license a page's ClearKey session accepts.
*/
pub fn build_license(keys: &[ContentKey]) -> String {
    let set = JsonWebKeySet {
        keys: keys
            .iter()
            .map(|key| JsonWebKey {
                kty: "oct".into(),
                alg: Some("A128KW".into()),
                kid: BASE64URL_NOPAD.encode(&key.kid()),
                k: BASE64URL_NOPAD.encode(key.key()),
            })
            .collect(),
        session_type: Some(SESSION_TYPE.into()),
    };
    // Plain strings only, so serialization cannot fail.
    serde_json::to_string(&set).unwrap_or_default()
}

/**
    Key ids named by ClearKey init data: either the `keyids` JSON format or
    a `pssh` box carrying key ids.
*/
pub fn key_ids_from_init_data(init_data: &[u8]) -> EmeResult<Vec<[u8; 16]>> {
    let kids = if init_data.first() == Some(&b'{') {
        let request: LicenseRequest =
            serde_json::from_slice(init_data).map_err(|e| EmeError::ClearKey(e.to_string()))?;
        request
            .kids
            .iter()
            .map(|kid| {
                let bytes = decode_b64url("kid", kid)?;
                <[u8; 16]>::try_from(bytes.as_slice())
                    .map_err(|_| EmeError::ClearKey(format!("kid is {} bytes", bytes.len())))
            })
            .collect::<EmeResult<Vec<_>>>()?
    } else {
        PsshBox::from_bytes(init_data)
            .map_err(|e| EmeError::ClearKey(e.to_string()))?
            .key_ids
    };

    if kids.is_empty() {
        return Err(EmeError::ClearKey("init data names no key ids".into()));
    }
    Ok(kids)
}

/**
    Build a ClearKey license request for the given key ids.
*/
pub fn build_request(kids: &[[u8; 16]]) -> String {
    let request = LicenseRequest {
        kids: kids.iter().map(|kid| BASE64URL_NOPAD.encode(kid)).collect(),
        session_type: Some(SESSION_TYPE.into()),
    };
    serde_json::to_string(&request).unwrap_or_default()
}

/**
    ClearKey pass-through. The device scope is irrelevant.
*/
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearKeySystem;

impl KeySystem for ClearKeySystem {
    fn system_id(&self) -> SystemId {
        SystemId::ClearKey
    }

    fn create_challenge(&self, _scope: &str, init_data: &[u8]) -> EmeResult<PendingChallenge> {
        let request = build_request(&key_ids_from_init_data(init_data)?);
        Ok(PendingChallenge {
            message: request.clone().into_bytes(),
            header: request,
        })
    }

    fn complete(&self, _scope: &str, _header: &str, response: &[u8]) -> EmeResult<Vec<SessionKey>> {
        Ok(parse_response(response)?.into_iter().map(SessionKey::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const KID: [u8; 16] = hex!("e11a656fe4db3444bcb4690d1564c41c");
    const KEY: [u8; 16] = hex!("00112233445566778899aabbccddeeff");

    #[test]
    fn parses_w3c_example() {
        let json = br#"{"keys":[{"kty":"oct","kid":"4RplbvTbNES8tGkNFWTEHA","k":"ABEiM0RVZneImaq7zN3u_w"}],"type":"temporary"}"#;
        let keys = parse_response(json).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].kid(), hex!("e11a656ef4db3444bcb4690d1564c41c"));
        assert_eq!(keys[0].key(), &KEY);
    }

    #[test]
    fn tolerates_padding_and_skips_other_kty() {
        let json = br#"{"keys":[
            {"kty":"RSA","kid":"AAAAAAAAAAAAAAAAAAAAAA","k":"AA"},
            {"kty":"oct","kid":"4RplbvTbNES8tGkNFWTEHA==","k":"ABEiM0RVZneImaq7zN3u_w=="}
        ]}"#;
        let keys = parse_response(json).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key(), &KEY);
    }

    #[test]
    fn malformed_responses() {
        assert!(matches!(parse_response(b"not json"), Err(EmeError::ClearKey(_))));
        assert!(matches!(
            parse_response(br#"{"keys":[{"kty":"oct","kid":"AAAA","k":"AA"}]}"#),
            Err(EmeError::ClearKey(_))
        ));
    }

    #[test]
    fn license_round_trips_through_parser() {
        let key = ContentKey::from_aes128(KID, KEY);
        let license = build_license(std::slice::from_ref(&key));
        assert!(license.contains("\"alg\":\"A128KW\""));
        assert!(license.contains("\"type\":\"temporary\""));
        assert_eq!(parse_response(license.as_bytes()).unwrap(), vec![key]);
    }

    #[test]
    fn key_ids_from_keyids_json() {
        let kids = key_ids_from_init_data(br#"{"kids":["4RplbvTbNES8tGkNFWTEHA"]}"#).unwrap();
        assert_eq!(kids, vec![hex!("e11a656ef4db3444bcb4690d1564c41c")]);
    }

    #[test]
    fn key_ids_from_pssh() {
        let mut pssh = PsshBox::new(SystemId::ClearKey, Vec::new());
        pssh.version = 1;
        pssh.key_ids = vec![KID];
        assert_eq!(key_ids_from_init_data(&pssh.to_bytes()).unwrap(), vec![KID]);

        let v0 = PsshBox::new(SystemId::ClearKey, Vec::new());
        assert!(key_ids_from_init_data(&v0.to_bytes()).is_err());
    }

    #[test]
    fn challenge_is_license_request() {
        let pending = ClearKeySystem
            .create_challenge("any", br#"{"kids":["4RplbvTbNES8tGkNFWTEHA"]}"#)
            .unwrap();
        assert_eq!(
            pending.message,
            br#"{"kids":["4RplbvTbNES8tGkNFWTEHA"],"type":"temporary"}"#
        );
    }
}
