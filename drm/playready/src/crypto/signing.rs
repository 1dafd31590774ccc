/*!
    ECDSA-P256 with SHA-256, as used for the challenge signature.

    Signatures are the raw 64-byte `r || s` form, not DER.
*/

use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

use super::ecc::EccKey;
use crate::error::{CdmError, CdmResult};

pub fn ecdsa_sha256_sign(key: &EccKey, message: &[u8]) -> CdmResult<[u8; 64]> {
    let signing_key = SigningKey::from(*key.scalar());
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| CdmError::EccOperation(e.to_string()))?;
    let mut out = [0u8; 64];
    out.copy_from_slice(&signature.to_bytes());
    Ok(out)
}

/**
    Verify a raw `r || s` signature against an uncompressed `X || Y`
    public key. Malformed keys or signatures verify as false.
*/
pub fn ecdsa_sha256_verify(public_key: &[u8; 64], message: &[u8], signature: &[u8]) -> bool {
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(public_key);

    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&sec1) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}
