/*!
    License challenge construction.

    A challenge is a SOAP `AcquireLicense` request. Its signed `<LA>` body
    carries the WRM header, a nonce, the client time and two ciphertexts:

    - the key cipher: a fresh ephemeral P-256 point, ElGamal-encrypted to
      the license server's WMRM key
    - the data cipher: `iv || AES-128-CBC(client data)`, keyed by the X
      coordinate of that ephemeral point

    The SHA-256 digest of `<LA>` goes into `<SignedInfo>`, which is signed
    with the device signing key.
*/

use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::BASE64;
use sha2::{Digest, Sha256};
use tracing::debug;

use drm_playready_format::{soap, wrm_header::WrmHeader};

use crate::constants::{DEFAULT_CLIENT_VERSION, WMRM_SERVER_KEY};
use crate::crypto::{
    aes,
    ecc::{CurvePoint, EccKey},
    elgamal, random_bytes, signing,
};
use crate::device::Device;
use crate::error::{CdmError, CdmResult};

/**
    Optional knobs for challenge construction.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOptions {
    /**
        Announced in `<CLIENTVERSION>`.
    */
    pub client_version: String,
    /**
        Revocation list XML, inserted verbatim after `<CLIENTINFO>`.
    */
    pub revocation_lists: String,
}

impl Default for ChallengeOptions {
    fn default() -> Self {
        Self {
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            revocation_lists: String::new(),
        }
    }
}

/**
    Ephemeral transport key, created per challenge and dropped once the
    challenge is built.
*/
struct XmlKey {
    key: EccKey,
    aes_iv: [u8; 16],
    aes_key: [u8; 16],
}

impl XmlKey {
    fn generate() -> Self {
        let key = EccKey::generate();
        let public = key.public_bytes();
        let mut aes_iv = [0u8; 16];
        let mut aes_key = [0u8; 16];
        aes_iv.copy_from_slice(&public[..16]);
        aes_key.copy_from_slice(&public[16..32]);
        Self {
            key,
            aes_iv,
            aes_key,
        }
    }

    fn key_cipher(&self) -> CdmResult<[u8; elgamal::CIPHERTEXT_LEN]> {
        let server = CurvePoint::from_xy(&WMRM_SERVER_KEY)?;
        elgamal::encrypt(&self.key.public_point(), &server).to_bytes()
    }

    fn data_cipher(&self, certificate_chain: &[u8]) -> Vec<u8> {
        let body = client_data_xml(certificate_chain);
        let mut out = self.aes_iv.to_vec();
        out.extend(aes::aes_cbc_encrypt(
            &self.aes_key,
            &self.aes_iv,
            body.as_bytes(),
        ));
        out
    }
}

/**
    Build a signed license challenge for `wrm_header`.

    The header is parsed before any key material is generated; a header
    that is not well-formed XML with a `WRMHEADER` root fails with
    [`CdmError::InvalidHeader`]. The header string itself is embedded
    verbatim.
*/
pub fn build_challenge(
    device: &Device,
    wrm_header: &str,
    options: &ChallengeOptions,
) -> CdmResult<String> {
    let header = WrmHeader::from_xml(wrm_header).map_err(CdmError::InvalidHeader)?;
    let protocol_version = header.protocol_version();

    let xml_key = XmlKey::generate();
    let key_cipher = xml_key.key_cipher()?;
    let data_cipher = xml_key.data_cipher(device.certificate_chain());

    let la = build_la_element(&LaFields {
        protocol_version,
        wrm_header,
        client_version: &options.client_version,
        revocation_lists: &options.revocation_lists,
        nonce: &random_bytes::<16>(),
        client_time: unix_time(),
        key_cipher: &key_cipher,
        data_cipher: &data_cipher,
    });

    let signed_info = build_signed_info_element(&Sha256::digest(la.as_bytes()));
    let signature = signing::ecdsa_sha256_sign(device.signing_key(), signed_info.as_bytes())?;

    debug!(
        protocol_version,
        header_len = wrm_header.len(),
        kids = header.kids.len(),
        "built license challenge"
    );

    Ok(build_soap_envelope(
        &la,
        &signed_info,
        &signature,
        device.signing_public_key(),
    ))
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn client_data_xml(certificate_chain: &[u8]) -> String {
    format!(
        "<Data>\
<CertificateChains>\
<CertificateChain>{chain}</CertificateChain>\
</CertificateChains>\
<Features>\
<Feature Name=\"AESCBC\">\"\"</Feature>\
<REE>\
<AESCBCS></AESCBCS>\
</REE>\
</Features>\
</Data>",
        chain = BASE64.encode(certificate_chain),
    )
}

struct LaFields<'a> {
    protocol_version: u32,
    wrm_header: &'a str,
    client_version: &'a str,
    revocation_lists: &'a str,
    nonce: &'a [u8; 16],
    client_time: u64,
    key_cipher: &'a [u8],
    data_cipher: &'a [u8],
}

/**
    The `<LA>` element. Its exact bytes are what gets digested, so no
    whitespace is inserted anywhere.
*/
fn build_la_element(f: &LaFields<'_>) -> String {
    format!(
        "<LA xmlns=\"{protocol_ns}\" Id=\"SignedData\" xml:space=\"preserve\">\
<Version>{version}</Version>\
<ContentHeader>{header}</ContentHeader>\
<CLIENTINFO>\
<CLIENTVERSION>{client_version}</CLIENTVERSION>\
</CLIENTINFO>\
{revocation_lists}\
<LicenseNonce>{nonce}</LicenseNonce>\
<ClientTime>{client_time}</ClientTime>\
<EncryptedData xmlns=\"{xmlenc_ns}\" Type=\"{xmlenc_ns}Element\">\
<EncryptionMethod Algorithm=\"{aes_algorithm}\"></EncryptionMethod>\
<KeyInfo xmlns=\"{xmldsig_ns}\">\
<EncryptedKey xmlns=\"{xmlenc_ns}\">\
<EncryptionMethod Algorithm=\"{ecc_algorithm}\"></EncryptionMethod>\
<KeyInfo xmlns=\"{xmldsig_ns}\">\
<KeyName>WMRMServer</KeyName>\
</KeyInfo>\
<CipherData>\
<CipherValue>{key_cipher}</CipherValue>\
</CipherData>\
</EncryptedKey>\
</KeyInfo>\
<CipherData>\
<CipherValue>{data_cipher}</CipherValue>\
</CipherData>\
</EncryptedData>\
</LA>",
        protocol_ns = soap::PROTOCOL_NS,
        version = f.protocol_version,
        header = f.wrm_header,
        client_version = f.client_version,
        revocation_lists = f.revocation_lists,
        nonce = BASE64.encode(f.nonce),
        client_time = f.client_time,
        xmlenc_ns = soap::XMLENC_NS,
        xmldsig_ns = soap::XMLDSIG_NS,
        aes_algorithm = soap::AES128_CBC_ALGORITHM,
        ecc_algorithm = soap::ECC256_ALGORITHM,
        key_cipher = BASE64.encode(f.key_cipher),
        data_cipher = BASE64.encode(f.data_cipher),
    )
}

fn build_signed_info_element(la_digest: &[u8]) -> String {
    format!(
        "<SignedInfo xmlns=\"{xmldsig_ns}\">\
<CanonicalizationMethod Algorithm=\"{c14n_algorithm}\"></CanonicalizationMethod>\
<SignatureMethod Algorithm=\"{ecdsa_algorithm}\"></SignatureMethod>\
<Reference URI=\"#SignedData\">\
<DigestMethod Algorithm=\"{sha256_algorithm}\"></DigestMethod>\
<DigestValue>{digest}</DigestValue>\
</Reference>\
</SignedInfo>",
        xmldsig_ns = soap::XMLDSIG_NS,
        c14n_algorithm = soap::C14N_ALGORITHM,
        ecdsa_algorithm = soap::ECDSA_SHA256_ALGORITHM,
        sha256_algorithm = soap::SHA256_ALGORITHM,
        digest = BASE64.encode(la_digest),
    )
}

fn build_soap_envelope(
    la_xml: &str,
    signed_info_xml: &str,
    signature: &[u8; 64],
    signing_public_key: &[u8; 64],
) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
<soap:Envelope \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
xmlns:soap=\"{soap_ns}\">\
<soap:Body>\
<AcquireLicense xmlns=\"{protocol_ns}\">\
<challenge>\
<Challenge xmlns=\"{message_ns}\">\
{la_xml}\
<Signature xmlns=\"{xmldsig_ns}\">\
{signed_info_xml}\
<SignatureValue>{signature}</SignatureValue>\
<KeyInfo xmlns=\"{xmldsig_ns}\">\
<KeyValue>\
<ECCKeyValue>\
<PublicKey>{public_key}</PublicKey>\
</ECCKeyValue>\
</KeyValue>\
</KeyInfo>\
</Signature>\
</Challenge>\
</challenge>\
</AcquireLicense>\
</soap:Body>\
</soap:Envelope>",
        soap_ns = soap::SOAP_NS,
        protocol_ns = soap::PROTOCOL_NS,
        message_ns = soap::MESSAGE_NS,
        xmldsig_ns = soap::XMLDSIG_NS,
        signature = BASE64.encode(signature),
        public_key = BASE64.encode(signing_public_key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decrypt_cbc, element_text, well_formed};
    use drm_playready_format::FormatError;

    const HEADER_42: &str = "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"4.2.0.0\"><DATA><PROTECTINFO><KIDS><KID ALGID=\"AESCTR\" VALUE=\"ABEiM0RVZneImaq7zN3u/w==\"></KID></KIDS></PROTECTINFO></DATA></WRMHEADER>";

    fn header(version: &str) -> String {
        format!(
            "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"{version}\"><DATA></DATA></WRMHEADER>"
        )
    }

    #[test]
    fn challenge_is_well_formed_and_signed() {
        let device = Device::generate(b"certificate chain".to_vec());
        let challenge = build_challenge(&device, HEADER_42, &ChallengeOptions::default()).unwrap();

        assert!(well_formed(&challenge));
        let signature = element_text(&challenge, "SignatureValue").unwrap();
        assert_eq!(signature.len(), 88);

        let signed_info_start = challenge.find("<SignedInfo").unwrap();
        let signed_info_end = challenge.find("</SignedInfo>").unwrap() + "</SignedInfo>".len();
        let signed_info = &challenge[signed_info_start..signed_info_end];
        let raw_signature = BASE64.decode(signature.as_bytes()).unwrap();
        assert!(signing::ecdsa_sha256_verify(
            device.signing_public_key(),
            signed_info.as_bytes(),
            &raw_signature
        ));

        let public_key = element_text(&challenge, "PublicKey").unwrap();
        assert_eq!(
            BASE64.decode(public_key.as_bytes()).unwrap(),
            device.signing_public_key().to_vec()
        );
    }

    #[test]
    fn digest_covers_la_element() {
        let device = Device::generate(b"chain".to_vec());
        let challenge = build_challenge(&device, HEADER_42, &ChallengeOptions::default()).unwrap();

        let la_start = challenge.find("<LA ").unwrap();
        let la_end = challenge.find("</LA>").unwrap() + "</LA>".len();
        let digest = Sha256::digest(challenge[la_start..la_end].as_bytes());
        assert_eq!(
            element_text(&challenge, "DigestValue").unwrap(),
            BASE64.encode(&digest)
        );
        assert!(challenge.contains(&format!("<ContentHeader>{HEADER_42}</ContentHeader>")));
    }

    #[test]
    fn protocol_version_follows_header_version() {
        let device = Device::generate(b"chain".to_vec());
        for (version, expected) in [
            ("4.3.0.0", 5),
            ("4.2.0.0", 4),
            ("4.1.0.0", 1),
            ("4.0.0.0", 1),
            ("9.9.9.9", 1),
        ] {
            let challenge =
                build_challenge(&device, &header(version), &ChallengeOptions::default()).unwrap();
            assert!(challenge.contains(&format!("<Version>{expected}</Version>")));
        }
    }

    #[test]
    fn options_are_embedded() {
        let device = Device::generate(b"chain".to_vec());
        let options = ChallengeOptions {
            client_version: "1.2.3.4".into(),
            revocation_lists: "<RevocationLists></RevocationLists>".into(),
        };
        let challenge = build_challenge(&device, HEADER_42, &options).unwrap();
        assert!(challenge.contains(
            "<CLIENTINFO><CLIENTVERSION>1.2.3.4</CLIENTVERSION></CLIENTINFO><RevocationLists></RevocationLists><LicenseNonce>"
        ));

        let default = build_challenge(&device, HEADER_42, &ChallengeOptions::default()).unwrap();
        assert!(default.contains("<CLIENTVERSION>10.0.16384.10011</CLIENTVERSION></CLIENTINFO><LicenseNonce>"));
    }

    #[test]
    fn data_cipher_carries_certificate_chain() {
        let device = Device::generate(b"my certificate".to_vec());
        let xml_key = XmlKey::generate();
        let cipher = xml_key.data_cipher(device.certificate_chain());

        assert_eq!(&cipher[..16], &xml_key.aes_iv);
        let plain = decrypt_cbc(&xml_key.aes_key, &cipher[..16], &cipher[16..]);
        assert_eq!(plain, client_data_xml(b"my certificate").into_bytes());
        assert!(String::from_utf8(plain).unwrap().contains(&format!(
            "<CertificateChain>{}</CertificateChain>",
            BASE64.encode(b"my certificate")
        )));
    }

    #[test]
    fn key_cipher_is_fresh_per_challenge() {
        let a = XmlKey::generate();
        let b = XmlKey::generate();
        assert_ne!(a.aes_key, b.aes_key);
        assert_ne!(a.key_cipher().unwrap(), a.key_cipher().unwrap());

        let device = Device::generate(b"chain".to_vec());
        let one = build_challenge(&device, HEADER_42, &ChallengeOptions::default()).unwrap();
        let two = build_challenge(&device, HEADER_42, &ChallengeOptions::default()).unwrap();
        assert_ne!(
            element_text(&one, "LicenseNonce"),
            element_text(&two, "LicenseNonce")
        );
    }

    #[test]
    fn malformed_header_rejected_before_crypto() {
        let device = Device::generate(b"chain".to_vec());
        for bad in ["not xml <", "<DATA></DATA>", ""] {
            let err = build_challenge(&device, bad, &ChallengeOptions::default()).unwrap_err();
            assert!(matches!(err, CdmError::InvalidHeader(_)), "{bad}: {err:?}");
        }
        assert!(matches!(
            build_challenge(&device, "<DATA/>", &ChallengeOptions::default()),
            Err(CdmError::InvalidHeader(FormatError::MissingElement("WRMHEADER")))
        ));
    }

    #[test]
    fn odd_key_ids_do_not_block_challenge() {
        let device = Device::generate(b"chain".to_vec());
        for kid in ["", "AAEC", "ABEiM0RVZneImaq7zN3u/w"] {
            let header = format!(
                "<WRMHEADER xmlns=\"http://schemas.microsoft.com/DRM/2007/03/PlayReadyHeader\" version=\"4.3.0.0\"><DATA><PROTECTINFO><KIDS><KID ALGID=\"AESCBC\" VALUE=\"{kid}\"></KID></KIDS></PROTECTINFO></DATA></WRMHEADER>"
            );
            let challenge = build_challenge(&device, &header, &ChallengeOptions::default())
                .unwrap_or_else(|e| panic!("{kid:?}: {e}"));
            assert!(well_formed(&challenge));
            assert!(challenge.contains(&format!("<ContentHeader>{header}</ContentHeader>")));
            assert!(challenge.contains("<Version>5</Version>"));
        }
    }
}
