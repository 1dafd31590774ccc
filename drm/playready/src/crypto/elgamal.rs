/*!
    ElGamal encryption over P-256, used only to transport key material.

    ```text
    encrypt(M, Pub):  k random, point1 = G * k, point2 = M + Pub * k
    decrypt(ct, priv): M = point2 - point1 * priv
    ```

    On the wire a ciphertext is `point1.x || point1.y || point2.x || point2.y`,
    128 bytes of big-endian field elements.
*/

use p256::NonZeroScalar;
use rand::rngs::OsRng;

use super::ecc::{CurvePoint, EccKey};
use crate::error::{CdmError, CdmResult};

pub const CIPHERTEXT_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    pub point1: CurvePoint,
    pub point2: CurvePoint,
}

impl Ciphertext {
    /**
        Decode the first 128 bytes. Trailing bytes are ignored, since
        wrapped content keys may carry more data after the ciphertext.
    */
    pub fn from_bytes(data: &[u8]) -> CdmResult<Self> {
        if data.len() < CIPHERTEXT_LEN {
            return Err(CdmError::ElGamalDecryptFailed(format!(
                "ciphertext too short: {} bytes, need at least {CIPHERTEXT_LEN}",
                data.len()
            )));
        }
        Ok(Self {
            point1: CurvePoint::from_slice(&data[..64])?,
            point2: CurvePoint::from_slice(&data[64..CIPHERTEXT_LEN])?,
        })
    }

    pub fn to_bytes(&self) -> CdmResult<[u8; CIPHERTEXT_LEN]> {
        let mut out = [0u8; CIPHERTEXT_LEN];
        out[..64].copy_from_slice(&self.point1.to_xy()?);
        out[64..].copy_from_slice(&self.point2.to_xy()?);
        Ok(out)
    }
}

/**
    Encrypt `message` to `recipient`. A fresh ephemeral scalar is drawn on
    every call.
*/
pub fn encrypt(message: &CurvePoint, recipient: &CurvePoint) -> Ciphertext {
    let k = NonZeroScalar::random(&mut OsRng);
    Ciphertext {
        point1: CurvePoint::generator().mul(&k),
        point2: message.add(&recipient.mul(&k)),
    }
}

pub fn decrypt(ciphertext: &Ciphertext, key: &EccKey) -> CurvePoint {
    let shared = ciphertext.point1.mul(key.scalar());
    ciphertext.point2.sub(&shared)
}

/**
    Decrypt a serialized ciphertext and return the X coordinate of the
    recovered point, which is where the transported key material lives.
*/
pub fn decrypt_x(ciphertext: &[u8], key: &EccKey) -> CdmResult<[u8; 32]> {
    let point = decrypt(&Ciphertext::from_bytes(ciphertext)?, key);
    point
        .x_bytes()
        .map_err(|_| CdmError::ElGamalDecryptFailed("decrypted to the point at infinity".into()))
}
