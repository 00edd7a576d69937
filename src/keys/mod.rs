/// Signify-compatible secret key container.
///
/// Binary layout (104 bytes total):
/// [sig_alg "Ed"(2) | kdf_alg "BK"(2) | rounds u32 BE(4) | salt(16) | checksum(8) | key_id(8) | key_material(64)]
///
/// `rounds == 0` means the 64-byte key material is plaintext (unlocked);
/// `rounds > 0` means it is XOR-masked with bcrypt_pbkdf output derived
/// from (passphrase, salt, rounds). The checksum is the truncated SHA-512
/// of the *plaintext* material and is the only signal distinguishing a
/// correct passphrase from a wrong one or a corrupted file.
pub mod file;

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

use crate::crypto::hash;
use crate::crypto::kdf;
use crate::crypto::sensitive::SensitiveBytes64;
use crate::error::{Result, SignerError};

/// Signature algorithm tag: Ed25519.
pub const SIGNATURE_ALGORITHM: [u8; 2] = *b"Ed";
/// KDF algorithm tag: bcrypt_pbkdf.
pub const KDF_ALGORITHM: [u8; 2] = *b"BK";

pub const SALT_LEN: usize = kdf::SALT_LEN;
pub const CHECKSUM_LEN: usize = hash::CHECKSUM_LEN;
pub const KEY_ID_LEN: usize = 8;
pub const KEY_MATERIAL_LEN: usize = 64;
pub const CONTAINER_LEN: usize = 2 + 2 + 4 + SALT_LEN + CHECKSUM_LEN + KEY_ID_LEN + KEY_MATERIAL_LEN;
pub const PUBLIC_KEY_LEN: usize = 2 + KEY_ID_LEN + 32;

/// KDF rounds applied when locking a key.
pub const DEFAULT_ROUNDS: u32 = 42;

/// Explicit lock state, replacing the wire format's dual-purpose rounds
/// integer. Unlocked keys serialize with `rounds == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfState {
    Unlocked,
    Locked { rounds: u32 },
}

impl KdfState {
    fn rounds(&self) -> u32 {
        match self {
            KdfState::Unlocked => 0,
            KdfState::Locked { rounds } => *rounds,
        }
    }
}

/// A parsed secret key container.
///
/// The salt field is kept even while unlocked: it carries no meaning in
/// that state, but re-serialization must reproduce the input byte for
/// byte. Locking always replaces it with a fresh one.
pub struct SecretKey {
    state: KdfState,
    salt: [u8; SALT_LEN],
    checksum: [u8; CHECKSUM_LEN],
    key_id: [u8; KEY_ID_LEN],
    material: SensitiveBytes64,
}

/// The public verification half: "Ed" || key_id || public key, 42 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    key_id: [u8; KEY_ID_LEN],
    key: [u8; 32],
}

impl SecretKey {
    /// Generate a fresh unlocked key pair with a random key id.
    pub fn generate() -> (SecretKey, PublicKey) {
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let material = SensitiveBytes64::new(signing.to_keypair_bytes());

        let mut key_id = [0u8; KEY_ID_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key_id);

        let mut public = [0u8; 32];
        public.copy_from_slice(&material.as_bytes()[32..]);

        let secret = SecretKey {
            state: KdfState::Unlocked,
            salt: [0u8; SALT_LEN],
            checksum: hash::key_checksum(material.as_bytes()),
            key_id,
            material,
        };
        (secret, PublicKey { key_id, key: public })
    }

    /// Parse a container from raw bytes.
    ///
    /// Structural validation only: length and algorithm tags. No
    /// cryptographic check happens here; masked and plaintext material
    /// pass through the codec identically.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != CONTAINER_LEN {
            return Err(SignerError::Format(format!(
                "expected {CONTAINER_LEN}-byte secret key, got {}",
                bytes.len()
            )));
        }
        if bytes[0..2] != SIGNATURE_ALGORITHM {
            return Err(SignerError::UnsupportedAlgorithm(
                "unknown signature algorithm".into(),
            ));
        }
        if bytes[2..4] != KDF_ALGORITHM {
            return Err(SignerError::UnsupportedAlgorithm("unsupported KDF algorithm".into()));
        }

        let rounds = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[8..24]);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&bytes[24..32]);
        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&bytes[32..40]);
        let material = SensitiveBytes64::from_slice(&bytes[40..104])
            .ok_or_else(|| SignerError::Format("truncated key material".into()))?;

        let state = if rounds == 0 {
            KdfState::Unlocked
        } else {
            KdfState::Locked { rounds }
        };

        Ok(SecretKey {
            state,
            salt,
            checksum,
            key_id,
            material,
        })
    }

    /// Serialize to the fixed 104-byte layout. Inverse of `from_bytes`.
    pub fn to_bytes(&self) -> [u8; CONTAINER_LEN] {
        let mut out = [0u8; CONTAINER_LEN];
        out[0..2].copy_from_slice(&SIGNATURE_ALGORITHM);
        out[2..4].copy_from_slice(&KDF_ALGORITHM);
        out[4..8].copy_from_slice(&self.state.rounds().to_be_bytes());
        out[8..24].copy_from_slice(&self.salt);
        out[24..32].copy_from_slice(&self.checksum);
        out[32..40].copy_from_slice(&self.key_id);
        out[40..104].copy_from_slice(self.material.as_bytes());
        out
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64.decode(encoded.trim())?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, KdfState::Locked { .. })
    }

    pub fn key_id(&self) -> &[u8; KEY_ID_LEN] {
        &self.key_id
    }

    /// Unmask the key material with the passphrase-derived XOR mask.
    ///
    /// Permitted from either state: unlocking an already-unlocked key only
    /// re-verifies the checksum. A checksum mismatch means wrong passphrase
    /// or corrupted file; the two are indistinguishable. The transformation
    /// is computed into a fresh buffer, so a failure leaves no
    /// half-unmasked container behind.
    pub fn unlock(self, passphrase: &[u8]) -> Result<SecretKey> {
        let unlocked = match self.state {
            KdfState::Unlocked => self,
            KdfState::Locked { rounds } => {
                let mask = kdf::derive(passphrase, &self.salt, rounds, KEY_MATERIAL_LEN)?;
                SecretKey {
                    state: KdfState::Unlocked,
                    salt: self.salt,
                    checksum: self.checksum,
                    key_id: self.key_id,
                    material: self.material.xor(&mask),
                }
            }
        };
        unlocked.verify_checksum()?;
        Ok(unlocked)
    }

    /// Mask the key material with the default round count. Fails on an
    /// already-locked key: its plaintext is unknown, so re-locking would
    /// destroy it.
    pub fn lock(self, passphrase: &[u8]) -> Result<SecretKey> {
        self.lock_with_rounds(passphrase, DEFAULT_ROUNDS)
    }

    /// Mask the key material with an explicit round count.
    ///
    /// A fresh random salt is generated on every call, so locking the same
    /// key twice with the same passphrase yields different ciphertexts.
    pub fn lock_with_rounds(self, passphrase: &[u8], rounds: u32) -> Result<SecretKey> {
        if self.is_locked() {
            return Err(SignerError::State("key is already locked".into()));
        }
        if rounds == 0 {
            return Err(SignerError::State("locking requires a nonzero round count".into()));
        }
        self.verify_checksum()?;

        let salt = kdf::generate_salt();
        let mask = kdf::derive(passphrase, &salt, rounds, KEY_MATERIAL_LEN)?;
        Ok(SecretKey {
            state: KdfState::Locked { rounds },
            salt,
            checksum: self.checksum,
            key_id: self.key_id,
            material: self.material.xor(&mask),
        })
    }

    /// Extract the public verification key. Requires an unlocked container
    /// with a valid checksum; pure, no mutation.
    pub fn public_key(&self) -> Result<PublicKey> {
        if self.is_locked() {
            return Err(SignerError::State("key is locked".into()));
        }
        self.verify_checksum()?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&self.material.as_bytes()[32..]);
        Ok(PublicKey {
            key_id: self.key_id,
            key,
        })
    }

    /// Build the Ed25519 signing key from unlocked material.
    pub fn signing_key(&self) -> Result<ed25519_dalek::SigningKey> {
        if self.is_locked() {
            return Err(SignerError::State("key is locked".into()));
        }
        self.verify_checksum()?;
        ed25519_dalek::SigningKey::from_keypair_bytes(self.material.as_bytes())
            .map_err(|_| SignerError::Format("key material is not a valid Ed25519 keypair".into()))
    }

    fn verify_checksum(&self) -> Result<()> {
        if self.checksum != hash::key_checksum(self.material.as_bytes()) {
            return Err(SignerError::Checksum);
        }
        Ok(())
    }
}

// Manual impl: the derived form would print the key material.
impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("state", &self.state)
            .field("key_id", &hex::encode(self.key_id))
            .field("material", &"<redacted>")
            .finish()
    }
}

impl PublicKey {
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64.decode(encoded.trim())?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(SignerError::Format(format!(
                "expected {PUBLIC_KEY_LEN}-byte public key, got {}",
                bytes.len()
            )));
        }
        if bytes[0..2] != SIGNATURE_ALGORITHM {
            return Err(SignerError::UnsupportedAlgorithm(
                "unknown signature algorithm".into(),
            ));
        }
        let mut key_id = [0u8; KEY_ID_LEN];
        key_id.copy_from_slice(&bytes[2..10]);
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[10..42]);
        Ok(PublicKey { key_id, key })
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out[0..2].copy_from_slice(&SIGNATURE_ALGORITHM);
        out[2..10].copy_from_slice(&self.key_id);
        out[10..42].copy_from_slice(&self.key);
        out
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn key_id(&self) -> &[u8; KEY_ID_LEN] {
        &self.key_id
    }

    pub fn verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.key)
            .map_err(|_| SignerError::Format("invalid Ed25519 public key".into()))
    }
}
