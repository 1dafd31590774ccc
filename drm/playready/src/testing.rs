/*!
    Server-side helpers for tests: synthetic XMR licenses wrapped to a
    device, license responses, and a few XML checks.

    Only compiled for this crate's tests or with the `testing` feature.
*/

use aes::{
    Aes128,
    cipher::{
        BlockDecrypt, BlockDecryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7,
        generic_array::GenericArray,
    },
};
use data_encoding::BASE64;
use p256::{
    AffinePoint, EncodedPoint,
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
};
use quick_xml::{Reader, events::Event};

use drm_playready_format::{
    key::{CipherType, KeyType},
    soap,
    wrm_header::kid_to_uuid,
    xmr::{XMR_MAGIC, object_type},
};

use crate::constants::MAGIC_CONSTANT_ZERO;
use crate::crypto::{aes as prim, ecc::CurvePoint, elgamal, random_bytes};
use crate::device::Device;

const OUTER_CONTAINER: u16 = 0x0001;
const KEY_MATERIAL_CONTAINER: u16 = 0x0009;
const SIGNATURE_RECORD_LEN: usize = 8 + 4 + 16;

enum KeyEntry {
    Wrapped {
        kid: [u8; 16],
        cipher: CipherType,
        key: [u8; 16],
    },
    Raw {
        kid_wire: [u8; 16],
        cipher: CipherType,
        encrypted: Vec<u8>,
    },
}

/**
    Builds a signed XMR license the way a license server would.

    Key ids are given in UUID byte order and written in the on-wire GUID
    layout. All wrapped keys of one license share a random integrity key,
    which also keys the license CMAC.
*/
pub struct LicenseBuilder<'a> {
    device: &'a Device,
    keys: Vec<KeyEntry>,
    aux_keys: Option<Vec<[u8; 16]>>,
    bound_to: Option<[u8; 64]>,
    signed: bool,
}

impl<'a> LicenseBuilder<'a> {
    pub fn new(device: &'a Device) -> Self {
        Self {
            device,
            keys: Vec::new(),
            aux_keys: None,
            bound_to: None,
            signed: true,
        }
    }

    pub fn content_key(mut self, kid: [u8; 16], cipher: CipherType, key: [u8; 16]) -> Self {
        self.keys.push(KeyEntry::Wrapped { kid, cipher, key });
        self
    }

    /**
        A content key the client cannot unwrap. Its encrypted key is filler.
    */
    pub fn unsupported_key(self, kid: [u8; 16], cipher: CipherType) -> Self {
        self.raw_content_key(kid_to_uuid(&kid), cipher, vec![0u8; 128])
    }

    /**
        A content key record with the given wire key id and encrypted key,
        written as is.
    */
    pub fn raw_content_key(
        mut self,
        kid_wire: [u8; 16],
        cipher: CipherType,
        encrypted: Vec<u8>,
    ) -> Self {
        self.keys.push(KeyEntry::Raw {
            kid_wire,
            cipher,
            encrypted,
        });
        self
    }

    /**
        Add an auxiliary keys record with one random key.
    */
    pub fn scalable(mut self) -> Self {
        if self.aux_keys.is_none() {
            self.aux_keys = Some(vec![random_bytes()]);
        }
        self
    }

    pub fn aux_keys(mut self, keys: Vec<[u8; 16]>) -> Self {
        self.aux_keys = Some(keys);
        self
    }

    /**
        Add a device key record naming `public_key`.
    */
    pub fn bound_to(mut self, public_key: [u8; 64]) -> Self {
        self.bound_to = Some(public_key);
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.signed = false;
        self
    }

    pub fn build(self) -> Vec<u8> {
        loop {
            let integrity_key = random_bytes::<16>();
            if let Some(license) = self.try_build(&integrity_key) {
                return license;
            }
        }
    }

    /*
        Fails when some wrapped key's transport value is not the X
        coordinate of any curve point; the caller retries with another
        integrity key.
    */
    fn try_build(&self, integrity_key: &[u8; 16]) -> Option<Vec<u8>> {
        let scalable = self.aux_keys.is_some();
        let aux_key = self
            .aux_keys
            .as_ref()
            .and_then(|keys| keys.first().copied())
            .unwrap_or_default();

        let mut key_material = Vec::new();
        if let Some(public_key) = &self.bound_to {
            let mut body = 1u16.to_be_bytes().to_vec();
            body.extend_from_slice(&64u16.to_be_bytes());
            body.extend_from_slice(public_key);
            key_material.extend(record(1, object_type::ECC_KEY, &body));
        }
        if let Some(keys) = &self.aux_keys {
            let mut body = (keys.len() as u16).to_be_bytes().to_vec();
            for (i, key) in keys.iter().enumerate() {
                body.extend_from_slice(&(i as u32).to_be_bytes());
                body.extend_from_slice(key);
            }
            key_material.extend(record(1, object_type::AUXILIARY_KEYS, &body));
        }
        for entry in &self.keys {
            let (kid_wire, cipher, encrypted) = match entry {
                KeyEntry::Wrapped { kid, cipher, key } => {
                    let encrypted = if scalable && *cipher == CipherType::Ecc256ViaSymmetric {
                        self.wrap_embedded_leaf(integrity_key, key, &aux_key)
                    } else if scalable {
                        self.wrap(&interleave(integrity_key, key))?
                    } else {
                        self.wrap(&concat(integrity_key, key))?
                    };
                    (kid_to_uuid(kid), *cipher, encrypted)
                }
                KeyEntry::Raw {
                    kid_wire,
                    cipher,
                    encrypted,
                } => (*kid_wire, *cipher, encrypted.clone()),
            };
            let mut body = kid_wire.to_vec();
            body.extend_from_slice(&KeyType::Aes128Ctr.to_u16().to_be_bytes());
            body.extend_from_slice(&cipher.to_u16().to_be_bytes());
            body.extend_from_slice(&(encrypted.len() as u16).to_be_bytes());
            body.extend_from_slice(&encrypted);
            key_material.extend(record(1, object_type::CONTENT_KEY, &body));
        }

        let key_container = container(KEY_MATERIAL_CONTAINER, key_material.len());
        let signature_len = if self.signed { SIGNATURE_RECORD_LEN } else { 0 };
        let outer_len = key_container.len() + key_material.len() + signature_len;

        let mut license = XMR_MAGIC.to_vec();
        license.extend_from_slice(&3u32.to_be_bytes());
        license.extend_from_slice(&[0x52; 16]);
        license.extend(container(OUTER_CONTAINER, outer_len));
        license.extend(key_container);
        license.extend(key_material);

        if self.signed {
            let mac = prim::aes_cmac(integrity_key, &license);
            let mut body = 1u16.to_be_bytes().to_vec();
            body.extend_from_slice(&16u16.to_be_bytes());
            body.extend_from_slice(&mac);
            license.extend(record(1, object_type::SIGNATURE, &body));
        }
        Some(license)
    }

    fn wrap(&self, x: &[u8; 32]) -> Option<Vec<u8>> {
        let point = point_with_x(x)?;
        let ciphertext = elgamal::encrypt(&point, &self.device.encryption_key().public_point());
        ciphertext.to_bytes().ok().map(|bytes| bytes.to_vec())
    }

    /**
        Inverse of the client-side embedded leaf unwrapping: the leaf holds
        `integrity_key || key`, AES-ECB decrypted under the secondary key
        and then under the uplink key.
    */
    fn wrap_embedded_leaf(
        &self,
        integrity_key: &[u8; 16],
        key: &[u8; 16],
        aux_key: &[u8; 16],
    ) -> Vec<u8> {
        let (transport, x) = loop {
            let x = random_bytes::<32>();
            if let Some(wrapped) = self.wrap(&x) {
                break (wrapped, x);
            }
        };
        let mut root_ck = [0u8; 16];
        for (i, pair) in x.chunks_exact(2).enumerate() {
            root_ck[i] = pair[1];
        }

        let mut rgb_key = [0u8; 16];
        for (out, (a, b)) in rgb_key.iter_mut().zip(root_ck.iter().zip(MAGIC_CONSTANT_ZERO)) {
            *out = a ^ b;
        }
        let content_key_prime = prim::aes_ecb_encrypt_block(&root_ck, &rgb_key);
        let uplink_x_key = prim::aes_ecb_encrypt_block(&content_key_prime, aux_key);
        let root_tail = random_bytes::<16>();
        let secondary_key = prim::aes_ecb_encrypt_block(&root_ck, &root_tail);

        let leaf = ecb_decrypt(&secondary_key, &concat(integrity_key, key));
        let leaf = ecb_decrypt(&uplink_x_key, &leaf);

        let mut out = transport;
        out.extend_from_slice(&root_tail);
        out.extend_from_slice(&leaf);
        out
    }
}

/**
    A SOAP license response carrying `licenses` as `<License>` elements.
*/
pub fn license_response(licenses: &[Vec<u8>]) -> String {
    let body: String = licenses
        .iter()
        .map(|license| format!("<License>{}</License>", BASE64.encode(license)))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
<soap:Envelope xmlns:soap=\"{soap_ns}\">\
<soap:Body>\
<AcquireLicenseResponse xmlns=\"{protocol_ns}\">\
<AcquireLicenseResult>\
<Response>\
<LicenseResponse xmlns=\"{message_ns}\">\
<Version>1</Version>\
<Licenses>{body}</Licenses>\
</LicenseResponse>\
</Response>\
</AcquireLicenseResult>\
</AcquireLicenseResponse>\
</soap:Body>\
</soap:Envelope>",
        soap_ns = soap::SOAP_NS,
        protocol_ns = soap::PROTOCOL_NS,
        message_ns = soap::MESSAGE_NS,
    )
}

/**
    True if `xml` parses to the end with matching tags.
*/
pub fn well_formed(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0i32;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => return depth == 0,
            Err(_) => return false,
            _ => {}
        }
    }
}

/**
    Text content of the first element named `name`, found textually.
*/
pub fn element_text(xml: &str, name: &str) -> Option<String> {
    let open = xml.find(&format!("<{name}"))?;
    let start = open + xml[open..].find('>')? + 1;
    let len = xml[start..].find(&format!("</{name}>"))?;
    Some(xml[start..start + len].to_string())
}

pub fn decrypt_cbc(key: &[u8; 16], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
    cbc::Decryptor::<Aes128>::new(key.into(), GenericArray::from_slice(iv))
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .unwrap_or_default()
}

fn ecb_decrypt(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(key.into());
    let mut out = data.to_vec();
    for block in out.chunks_exact_mut(16) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
    out
}

fn point_with_x(x: &[u8; 32]) -> Option<CurvePoint> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(x);
    let encoded = EncodedPoint::from_bytes(compressed).ok()?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))?;
    let uncompressed = affine.to_encoded_point(false);
    CurvePoint::from_slice(&uncompressed.as_bytes()[1..]).ok()
}

fn record(flags: u16, record_type: u16, body: &[u8]) -> Vec<u8> {
    let mut out = container_header(flags, record_type, body.len());
    out.extend_from_slice(body);
    out
}

fn container(record_type: u16, children_len: usize) -> Vec<u8> {
    container_header(2, record_type, children_len)
}

fn container_header(flags: u16, record_type: u16, body_len: usize) -> Vec<u8> {
    let mut out = flags.to_be_bytes().to_vec();
    out.extend_from_slice(&record_type.to_be_bytes());
    out.extend_from_slice(&(body_len as u32 + 8).to_be_bytes());
    out
}

fn concat(a: &[u8; 16], b: &[u8; 16]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(a);
    out[16..].copy_from_slice(b);
    out
}

fn interleave(even: &[u8; 16], odd: &[u8; 16]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..16 {
        out[2 * i] = even[i];
        out[2 * i + 1] = odd[i];
    }
    out
}
