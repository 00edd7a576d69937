/// bcrypt_pbkdf key derivation for passphrase-based key masking.
///
/// This is the same KDF used by OpenBSD signify: masks derived here are
/// interchangeable with masks produced by signify itself, so key files
/// travel both ways.
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Result, SignerError};

/// Salt length fixed by the key container format.
pub const SALT_LEN: usize = 16;

/// Generate a random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive `out_len` mask bytes from a passphrase and salt.
///
/// Deterministic: the same (passphrase, salt, rounds) always yields the
/// same output, which is what makes the XOR masking reversible.
pub fn derive(passphrase: &[u8], salt: &[u8; SALT_LEN], rounds: u32, out_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut output = Zeroizing::new(vec![0u8; out_len]);
    bcrypt_pbkdf::bcrypt_pbkdf(passphrase, salt, rounds, &mut output)
        .map_err(|e| SignerError::KeyDerivation(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_deterministic() {
        let salt = [0x42u8; SALT_LEN];
        let m1 = derive(b"my passphrase", &salt, 4, 64).unwrap();
        let m2 = derive(b"my passphrase", &salt, 4, 64).unwrap();
        assert_eq!(*m1, *m2);
        assert_eq!(m1.len(), 64);
    }

    #[test]
    fn test_derive_different_passphrase() {
        let salt = [0x42u8; SALT_LEN];
        let m1 = derive(b"passphrase1", &salt, 4, 64).unwrap();
        let m2 = derive(b"passphrase2", &salt, 4, 64).unwrap();
        assert_ne!(*m1, *m2);
    }

    #[test]
    fn test_derive_different_salt() {
        let m1 = derive(b"passphrase", &[0x01; SALT_LEN], 4, 64).unwrap();
        let m2 = derive(b"passphrase", &[0x02; SALT_LEN], 4, 64).unwrap();
        assert_ne!(*m1, *m2);
    }

    #[test]
    fn test_derive_rejects_zero_rounds() {
        assert!(derive(b"passphrase", &[0u8; SALT_LEN], 0, 64).is_err());
    }

    #[test]
    fn test_generate_salt_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
