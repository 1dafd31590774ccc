/*!
    PlayReady constants.
*/

use hex_literal::hex;

/**
    Public key of the license server's WMRM key (P-256, X || Y). The
    ephemeral challenge key is ElGamal-encrypted to it.
*/
pub const WMRM_SERVER_KEY: [u8; 64] = hex!(
    "c8b6af16ee941aadaa5389b4af2c10e356be42af175ef3face93254e7b0b3d9b"
    "982b27b5cb2341326e56aa857dbfd5c634ce2cf9ea74fca8f2af5957efeea562"
);

/**
    `RgbMagicConstantZero`, mixed into the content key when unwrapping an
    embedded leaf license.
*/
pub const MAGIC_CONSTANT_ZERO: [u8; 16] = hex!("7ee9ed4af773224f00b8ea7efb027cbb");

/**
    Client version announced in challenges unless overridden.
*/
pub const DEFAULT_CLIENT_VERSION: &str = "10.0.16384.10011";
