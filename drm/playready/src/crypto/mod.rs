pub mod aes;
pub mod ecc;
pub mod elgamal;
pub mod signing;

use rand::{RngCore, rngs::OsRng};

/**
    Fill a fixed-size buffer from the operating system CSPRNG.
*/
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}
