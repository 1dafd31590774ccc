/*!
    AES-128 primitives.

    - CBC with PKCS#7 padding encrypts the client data in a challenge.
    - ECB without padding is a keyed one-block mixing step in the embedded
      leaf license derivation.
    - CMAC authenticates XMR licenses.
*/

use aes::{
    Aes128,
    cipher::{
        BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
        block_padding::{NoPadding, Pkcs7},
        generic_array::GenericArray,
    },
};
use cmac::{Cmac, Mac};

pub fn aes_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    cbc::Encryptor::<Aes128>::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

pub fn aes_ecb_encrypt_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let mut out = GenericArray::clone_from_slice(block);
    Aes128::new(key.into()).encrypt_block(&mut out);
    out.into()
}

/**
    Encrypt every whole block of `data` under `key`. A trailing partial
    block, if any, is copied through unchanged.
*/
pub fn aes_ecb_encrypt(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let whole = data.len() - data.len() % 16;
    let mut out = ecb::Encryptor::<Aes128>::new(key.into())
        .encrypt_padded_vec_mut::<NoPadding>(&data[..whole]);
    out.extend_from_slice(&data[whole..]);
    out
}

pub fn aes_cmac(key: &[u8; 16], message: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<Aes128> as Mac>::new(key.into());
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/**
    Constant-time check of a CMAC tag.
*/
pub fn aes_cmac_verify(key: &[u8; 16], message: &[u8], tag: &[u8]) -> bool {
    let mut mac = <Cmac<Aes128> as Mac>::new(key.into());
    mac.update(message);
    mac.verify_slice(tag).is_ok()
}
