/// SHA-512 hashing utilities.
///
/// SHA-512 is fixed by the key container format: the container's 8-byte
/// checksum is the truncated SHA-512 of the plaintext key material, and
/// manifest entries carry the SHA-512 of each release artifact.
use sha2::{Digest, Sha512};

/// Length of the truncated key checksum in the container.
pub const CHECKSUM_LEN: usize = 8;

/// Hash arbitrary data with SHA-512.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    Sha512::digest(data).into()
}

/// Compute the container checksum: the first 8 bytes of the SHA-512 of
/// the *unlocked* key material. Never computed over masked bytes.
pub fn key_checksum(material: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha512(material);
    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&digest[..CHECKSUM_LEN]);
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_deterministic() {
        assert_eq!(sha512(b"hello relsign"), sha512(b"hello relsign"));
    }

    #[test]
    fn test_sha512_different_inputs() {
        assert_ne!(sha512(b"hello"), sha512(b"world"));
    }

    #[test]
    fn test_key_checksum_is_truncated_digest() {
        let material = [0x7fu8; 64];
        let checksum = key_checksum(&material);
        assert_eq!(checksum, sha512(&material)[..CHECKSUM_LEN]);
    }
}
