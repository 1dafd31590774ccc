/*!
    Small `const`-friendly byte helpers shared across the DRM crates.
*/

pub const fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

pub const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/**
    Parse a 16-byte identifier written as 32 hex digits, with or without
    UUID hyphens. Hex digits are case-insensitive.
*/
pub const fn parse_kid(s: &[u8]) -> Option<[u8; 16]> {
    let mut bytes = [0u8; 16];
    let mut bi = 0;
    let mut si = 0;

    while si < s.len() {
        if s[si] == b'-' {
            si += 1;
            continue;
        }
        if bi >= 16 || si + 1 >= s.len() {
            return None;
        }
        let (Some(hi), Some(lo)) = (hex_digit(s[si]), hex_digit(s[si + 1])) else {
            return None;
        };
        bytes[bi] = (hi << 4) | lo;
        bi += 1;
        si += 2;
    }

    if bi == 16 { Some(bytes) } else { None }
}

/**
    Convert between the mixed-endian GUID layout PlayReady stores on the
    wire and RFC 4122 byte order. The swap is its own inverse.
*/
pub const fn swap_guid_bytes(guid: [u8; 16]) -> [u8; 16] {
    let mut out = guid;
    out[0] = guid[3];
    out[1] = guid[2];
    out[2] = guid[1];
    out[3] = guid[0];
    out[4] = guid[5];
    out[5] = guid[4];
    out[6] = guid[7];
    out[7] = guid[6];
    out
}

/**
    Format 16 bytes as a lowercase hyphenated UUID string.
*/
pub fn format_uuid(b: &[u8; 16]) -> String {
    let h = hex::encode(b);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn parse_kid_accepts_plain_and_hyphenated() {
        let expected = hex!("9a04f07998404286ab92e65be0885f95");
        assert_eq!(parse_kid(b"9a04f07998404286ab92e65be0885f95"), Some(expected));
        assert_eq!(
            parse_kid(b"9A04F079-9840-4286-AB92-E65BE0885F95"),
            Some(expected)
        );
    }

    #[test]
    fn parse_kid_rejects_bad_input() {
        assert_eq!(parse_kid(b""), None);
        assert_eq!(parse_kid(b"9a04f079"), None);
        assert_eq!(parse_kid(b"9a04f07998404286ab92e65be0885f9"), None);
        assert_eq!(parse_kid(b"9a04f07998404286ab92e65be0885f9500"), None);
        assert_eq!(parse_kid(b"za04f07998404286ab92e65be0885f95"), None);
    }

    #[test]
    fn guid_swap_reorders_first_three_fields() {
        let wire = hex!("00112233445566778899aabbccddeeff");
        let swapped = swap_guid_bytes(wire);
        assert_eq!(swapped, hex!("33221100554477668899aabbccddeeff"));
        assert_eq!(swap_guid_bytes(swapped), wire);
    }

    #[test]
    fn uuid_formatting() {
        assert_eq!(
            format_uuid(&hex!("1077efecc0b24d02ace33c1e52e2fb4b")),
            "1077efec-c0b2-4d02-ace3-3c1e52e2fb4b"
        );
    }
}
