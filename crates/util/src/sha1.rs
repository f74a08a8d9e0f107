const SHA1_BYTE_SIZE: usize = 20;

pub type Sha1Bytes = [u8; SHA1_BYTE_SIZE];

/// Renders a SHA-1 digest the way the Mojang session server expects the
/// `serverId` parameter: the digest is treated as a two's-complement
/// big-endian integer and printed as signed lowercase hex with leading
/// zeros stripped.
///
/// Described here: https://wiki.vg/Protocol_Encryption#Authentication
pub fn minecraft_signed_hex(digest: Sha1Bytes) -> String {
    let negative = digest[0] & 0x80 != 0;

    let mut magnitude = digest;
    if negative {
        twos_complement(&mut magnitude);
    }

    let mut hex = String::with_capacity(2 * SHA1_BYTE_SIZE + 1);
    if negative {
        hex.push('-');
    }

    let mut nibbles = magnitude
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0F])
        .skip_while(|&n| n == 0)
        .peekable();

    if nibbles.peek().is_none() {
        hex.push('0');
    } else {
        hex.extend(
            nibbles.map(|n| char::from_digit(n as u32, 16).expect("n is always valid base16")),
        );
    }

    hex
}

fn twos_complement(bytes: &mut Sha1Bytes) {
    let mut carry = 1u16;
    for byte in bytes.iter_mut().rev() {
        let negated = u16::from(!*byte) + carry;
        *byte = negated as u8;
        carry = negated >> 8;
    }
}

#[cfg(test)]
mod tests {
    use sha1::{Digest, Sha1};

    use super::{minecraft_signed_hex, Sha1Bytes};

    /// Reference vectors from https://wiki.vg/Protocol_Encryption
    #[test]
    fn reference_vectors() {
        assert_eq!(
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48",
            minecraft_signed_hex(digest(b"Notch"))
        );
        assert_eq!(
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1",
            minecraft_signed_hex(digest(b"jeb_"))
        );
        assert_eq!(
            "88e16a1019277b15d58faf0541e11910eb756f6",
            minecraft_signed_hex(digest(b"simon"))
        );
    }

    /// Digest input for a session with an all-zero shared secret and an
    /// empty public key: sixteen zero bytes.
    #[test]
    fn all_zero_secret() {
        assert_eq!(
            "-1ed60d83aefc43a33bb4320f5ea1e9f2bbaf9901",
            minecraft_signed_hex(digest(&[0u8; 16]))
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            "-25c65c11a194b4f2cdaa40106a9fe76f5027f8f7",
            minecraft_signed_hex(digest(b""))
        );
    }

    #[test]
    fn zero_digest_keeps_single_zero() {
        assert_eq!("0", minecraft_signed_hex([0u8; 20]));
    }

    #[test]
    fn leading_zero_bytes_are_stripped() {
        let mut value = [0u8; 20];
        value[19] = 0x0A;
        assert_eq!("a", minecraft_signed_hex(value));

        value[18] = 0x01;
        assert_eq!("10a", minecraft_signed_hex(value));
    }

    /// The rendering is a bijection over 20-byte digests: parsing the
    /// signed-hex string yields the original bytes.
    #[test]
    fn parse_inverts_rendering() {
        let samples = [
            digest(b"Notch"),
            digest(b"jeb_"),
            digest(b"simon"),
            digest(&[0u8; 16]),
            [0u8; 20],
            [0xFF; 20],
            [0x80; 20],
        ];

        for sample in samples {
            assert_eq!(sample, parse(&minecraft_signed_hex(sample)));
        }
    }

    fn digest(input: &[u8]) -> Sha1Bytes {
        let mut hasher = Sha1::new();
        hasher.update(input);
        hasher.finalize().into()
    }

    fn parse(hex: &str) -> Sha1Bytes {
        let (negative, magnitude) = match hex.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, hex),
        };

        let mut bytes = [0u8; 20];
        for (i, c) in magnitude.chars().rev().enumerate() {
            let nibble = c.to_digit(16).unwrap() as u8;
            bytes[19 - i / 2] |= nibble << (4 * (i % 2) as u8);
        }

        if negative {
            let mut carry = 1u16;
            for byte in bytes.iter_mut().rev() {
                let negated = u16::from(!*byte) + carry;
                *byte = negated as u8;
                carry = negated >> 8;
            }
        }

        bytes
    }
}
