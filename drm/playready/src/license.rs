/*!
    License response processing.

    A response is a SOAP document with one base64 XMR blob per `<License>`
    element. Each blob is an independent container: its content keys are
    unwrapped with the device encryption key and only released once the
    container's CMAC verifies under the recovered integrity key. A
    container that fails anywhere yields no keys; its siblings are
    unaffected.
*/

use data_encoding::BASE64;
use quick_xml::{Reader, events::Event};
use tracing::{debug, warn};

use drm_core::ContentKey;
use drm_playready_format::{
    key::{CipherType, KeyType},
    soap::local_name,
    wrm_header::kid_to_uuid,
    xmr::{ContentKeyObject, XmrLicense},
};

use crate::constants::MAGIC_CONSTANT_ZERO;
use crate::crypto::{aes, elgamal};
use crate::device::Device;
use crate::error::{CdmError, CdmResult};

/*
    Layout of a symmetric (embedded leaf) encrypted key:
    [0..128)   ElGamal ciphertext
    [128..144) root license tail, mixed into the secondary key
    [144..)    embedded leaf license, integrity key then content key
*/
const ROOT_LICENSE_LEN: usize = 144;
const LEAF_KEYS_LEN: usize = 32;

/**
    A content key recovered from a verified license.
*/
#[derive(Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    /**
        Key id in RFC 4122 byte order.
    */
    pub kid: [u8; 16],
    pub key_type: KeyType,
    pub cipher_type: CipherType,
    pub key: [u8; 16],
}

impl RecoveredKey {
    pub fn to_content_key(&self) -> ContentKey {
        ContentKey::from_aes128(self.kid, self.key)
    }
}

impl From<&RecoveredKey> for ContentKey {
    fn from(key: &RecoveredKey) -> Self {
        key.to_content_key()
    }
}

impl core::fmt::Debug for RecoveredKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecoveredKey")
            .field("kid", &drm_core::format_uuid(&self.kid))
            .field("key_type", &self.key_type)
            .field("cipher_type", &self.cipher_type)
            .finish_non_exhaustive()
    }
}

/**
    Fail with [`CdmError::SoapFault`] if the response is a SOAP fault.
    Unparsable XML is not treated as a fault here.
*/
pub fn check_soap_fault(xml: &str) -> CdmResult<()> {
    let mut reader = Reader::from_str(xml);
    let mut in_fault = false;
    let mut in_faultstring = false;
    let mut fault_message = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fault" {
                    in_fault = true;
                    fault_message.get_or_insert_with(String::new);
                } else if in_fault && (local == b"faultstring" || local == b"Text") {
                    in_faultstring = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fault" {
                    in_fault = false;
                } else if local == b"faultstring" || local == b"Text" {
                    in_faultstring = false;
                }
            }
            Ok(Event::Text(e)) if in_faultstring => {
                if let Ok(text) = e.unescape() {
                    fault_message = Some(text.trim().to_string());
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    match fault_message {
        Some(msg) => Err(CdmError::SoapFault(msg)),
        None => Ok(()),
    }
}

/**
    The base64 text of every `<License>` element, in document order.
*/
pub fn extract_license_blobs(xml: &str) -> CdmResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut licenses = Vec::new();
    let mut current: Option<String> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if current.is_some() {
                    depth += 1;
                } else if local_name(name.as_ref()) == b"License" {
                    current = Some(String::new());
                    depth = 1;
                }
            }
            Ok(Event::End(_)) => {
                if current.is_some() {
                    depth -= 1;
                    if depth == 0
                        && let Some(text) = current.take()
                    {
                        licenses.push(text.trim().to_string());
                    }
                }
            }
            Ok(Event::Text(e)) if depth == 1 => {
                if let Some(text) = current.as_mut() {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| CdmError::InvalidXml(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CdmError::InvalidXml(e.to_string())),
            _ => {}
        }
    }

    Ok(licenses)
}

/**
    Decode the XMR containers of a license response.

    The outer `Err` covers problems with the response as a whole (SOAP
    fault, broken XML, no `<License>` elements). Each inner result is one
    container, so a bad blob does not hide its siblings.
*/
pub fn parse_license_response(response: &str) -> CdmResult<Vec<CdmResult<XmrLicense>>> {
    check_soap_fault(response)?;
    let blobs = extract_license_blobs(response)?;
    if blobs.is_empty() {
        return Err(CdmError::NoLicenses);
    }

    Ok(blobs
        .iter()
        .map(|blob| {
            let bytes = BASE64
                .decode(blob.as_bytes())
                .map_err(|e| CdmError::InvalidBase64(e.to_string()))?;
            Ok(XmrLicense::from_bytes(&bytes)?)
        })
        .collect())
}

/**
    Recover and verify every supported content key in one container.

    Content keys with cipher types other than ECC-256, ECC-256 with KZ and
    ECC-256 via symmetric are skipped. Any other failure rejects the whole
    container.
*/
pub fn process_license(device: &Device, license: &XmrLicense) -> CdmResult<Vec<RecoveredKey>> {
    if let Some(bound) = license.ecc_key()
        && bound.key.as_slice() != device.encryption_public_key().as_slice()
    {
        return Err(CdmError::DeviceKeyMismatch);
    }

    let scalable = license.is_scalable();
    debug!(
        records = license.records.len(),
        scalable, "processing license container"
    );

    let mut keys = Vec::new();
    for content_key in license.content_keys() {
        if !content_key.cipher_type.is_supported() {
            warn!(
                cipher_type = %content_key.cipher_type,
                kid = %drm_core::format_uuid(&kid_to_uuid(&content_key.key_id)),
                "skipping content key with unsupported cipher type"
            );
            continue;
        }
        debug!(
            cipher_type = %content_key.cipher_type,
            key_type = %content_key.key_type,
            "unwrapping content key"
        );

        let (integrity_key, key) = unwrap_content_key(device, license, content_key, scalable)?;
        verify_integrity(license, &integrity_key)?;

        keys.push(RecoveredKey {
            kid: kid_to_uuid(&content_key.key_id),
            key_type: content_key.key_type,
            cipher_type: content_key.cipher_type,
            key,
        });
    }
    Ok(keys)
}

/**
    Process every container of a response, one result per container.
*/
pub fn process_license_response(
    device: &Device,
    response: &str,
) -> CdmResult<Vec<CdmResult<Vec<RecoveredKey>>>> {
    Ok(parse_license_response(response)?
        .into_iter()
        .map(|license| process_license(device, &license?))
        .collect())
}

/**
    Returns `(integrity_key, content_key)`.
*/
fn unwrap_content_key(
    device: &Device,
    license: &XmrLicense,
    content_key: &ContentKeyObject,
    scalable: bool,
) -> CdmResult<([u8; 16], [u8; 16])> {
    let encrypted = &content_key.encrypted_key;
    if encrypted.len() < elgamal::CIPHERTEXT_LEN {
        return Err(CdmError::EncryptedKeyTooShort {
            cipher: content_key.cipher_type.to_name(),
            len: encrypted.len(),
        });
    }
    let decrypted = elgamal::decrypt_x(encrypted, device.encryption_key())?;

    if !scalable {
        return Ok(split_halves(&decrypted));
    }

    let (ci, ck) = deinterleave(&decrypted);
    if content_key.cipher_type != CipherType::Ecc256ViaSymmetric {
        return Ok((ci, ck));
    }

    unwrap_embedded_leaf(license, encrypted, &ck)
}

fn split_halves(bytes: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut ci = [0u8; 16];
    let mut ck = [0u8; 16];
    ci.copy_from_slice(&bytes[..16]);
    ck.copy_from_slice(&bytes[16..]);
    (ci, ck)
}

/**
    Even-indexed bytes form the integrity key, odd-indexed bytes the
    content key.
*/
fn deinterleave(bytes: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut ci = [0u8; 16];
    let mut ck = [0u8; 16];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        ci[i] = pair[0];
        ck[i] = pair[1];
    }
    (ci, ck)
}

fn unwrap_embedded_leaf(
    license: &XmrLicense,
    encrypted: &[u8],
    ck: &[u8; 16],
) -> CdmResult<([u8; 16], [u8; 16])> {
    if encrypted.len() < ROOT_LICENSE_LEN + LEAF_KEYS_LEN {
        return Err(CdmError::EncryptedKeyTooShort {
            cipher: CipherType::Ecc256ViaSymmetric.to_name(),
            len: encrypted.len(),
        });
    }
    let (root, leaf) = encrypted.split_at(ROOT_LICENSE_LEN);

    let aux_key = license
        .auxiliary_keys()
        .and_then(|aux| aux.keys.first())
        .ok_or(CdmError::MissingAuxiliaryKey)?;

    let mut rgb_key = [0u8; 16];
    for (out, (a, b)) in rgb_key.iter_mut().zip(ck.iter().zip(MAGIC_CONSTANT_ZERO)) {
        *out = a ^ b;
    }
    let content_key_prime = aes::aes_ecb_encrypt_block(ck, &rgb_key);
    let uplink_x_key = aes::aes_ecb_encrypt_block(&content_key_prime, &aux_key.key);

    let mut root_tail = [0u8; 16];
    root_tail.copy_from_slice(&root[elgamal::CIPHERTEXT_LEN..]);
    let secondary_key = aes::aes_ecb_encrypt_block(ck, &root_tail);

    let leaf = aes::aes_ecb_encrypt(&uplink_x_key, leaf);
    let leaf = aes::aes_ecb_encrypt(&secondary_key, &leaf);

    let mut keys = [0u8; 32];
    keys.copy_from_slice(&leaf[..LEAF_KEYS_LEN]);
    Ok(split_halves(&keys))
}

fn verify_integrity(license: &XmrLicense, integrity_key: &[u8; 16]) -> CdmResult<()> {
    let signature = license.signature().ok_or(CdmError::MissingSignature)?;
    let signed = license.signed_bytes().ok_or(CdmError::MissingSignature)?;
    if aes::aes_cmac_verify(integrity_key, signed, &signature.signature_data) {
        Ok(())
    } else {
        Err(CdmError::IntegrityCheckFailed)
    }
}
