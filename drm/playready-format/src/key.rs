/*!
    PlayReady key and cipher type codes carried in XMR content key objects.

    Key types name the content encryption algorithm, cipher types name how
    the content key itself was wrapped for the client. Unassigned values are
    kept as `Unknown` so licenses from newer servers still parse.
*/

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Invalid,
    Aes128Ctr,
    Rc4,
    Aes128Ecb,
    Cocktail,
    Aes128Cbc,
    KeyExchange,
    Unknown(u16),
}

impl KeyType {
    pub const fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::Invalid,
            1 => Self::Aes128Ctr,
            2 => Self::Rc4,
            3 => Self::Aes128Ecb,
            4 => Self::Cocktail,
            5 => Self::Aes128Cbc,
            6 => Self::KeyExchange,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Invalid => 0,
            Self::Aes128Ctr => 1,
            Self::Rc4 => 2,
            Self::Aes128Ecb => 3,
            Self::Cocktail => 4,
            Self::Aes128Cbc => 5,
            Self::KeyExchange => 6,
            Self::Unknown(v) => v,
        }
    }

    pub const fn to_name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Aes128Ctr => "AES_128_CTR",
            Self::Rc4 => "RC4",
            Self::Aes128Ecb => "AES_128_ECB",
            Self::Cocktail => "COCKTAIL",
            Self::Aes128Cbc => "AES_128_CBC",
            Self::KeyExchange => "KEY_EXCHANGE",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

/**
    Content key wrapping scheme.

    Only the three ECC-256 variants are recoverable by a software client:
    `Ecc256` (plain ElGamal), `Ecc256WithKz` (scalable) and
    `Ecc256ViaSymmetric` (embedded root/leaf license).
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherType {
    Invalid,
    Rsa1024,
    ChainedLicense,
    Ecc256,
    Ecc256WithKz,
    TeeTransient,
    Ecc256ViaSymmetric,
    Unknown(u16),
}

impl CipherType {
    pub const fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::Invalid,
            1 => Self::Rsa1024,
            2 => Self::ChainedLicense,
            3 => Self::Ecc256,
            4 => Self::Ecc256WithKz,
            5 => Self::TeeTransient,
            6 => Self::Ecc256ViaSymmetric,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Invalid => 0,
            Self::Rsa1024 => 1,
            Self::ChainedLicense => 2,
            Self::Ecc256 => 3,
            Self::Ecc256WithKz => 4,
            Self::TeeTransient => 5,
            Self::Ecc256ViaSymmetric => 6,
            Self::Unknown(v) => v,
        }
    }

    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Ecc256 | Self::Ecc256WithKz | Self::Ecc256ViaSymmetric
        )
    }

    pub const fn to_name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Rsa1024 => "RSA_1024",
            Self::ChainedLicense => "CHAINED_LICENSE",
            Self::Ecc256 => "ECC_256",
            Self::Ecc256WithKz => "ECC_256_WITH_KZ",
            Self::TeeTransient => "TEE_TRANSIENT",
            Self::Ecc256ViaSymmetric => "ECC_256_VIA_SYMMETRIC",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "UNKNOWN({v})"),
            other => f.write_str(other.to_name()),
        }
    }
}

impl fmt::Display for CipherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "UNKNOWN({v})"),
            other => f.write_str(other.to_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for v in 0..=8u16 {
            assert_eq!(KeyType::from_u16(v).to_u16(), v);
            assert_eq!(CipherType::from_u16(v).to_u16(), v);
        }
        assert_eq!(CipherType::from_u16(0xFFFF), CipherType::Unknown(0xFFFF));
    }

    #[test]
    fn supported_cipher_types() {
        let supported: Vec<u16> = (0..=10)
            .filter(|v| CipherType::from_u16(*v).is_supported())
            .collect();
        assert_eq!(supported, vec![3, 4, 6]);
    }

    #[test]
    fn display() {
        assert_eq!(KeyType::Aes128Ctr.to_string(), "AES_128_CTR");
        assert_eq!(CipherType::Ecc256ViaSymmetric.to_string(), "ECC_256_VIA_SYMMETRIC");
        assert_eq!(CipherType::Unknown(9).to_string(), "UNKNOWN(9)");
    }
}
