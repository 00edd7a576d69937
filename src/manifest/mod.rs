/// Update manifest: the signed document describing available release
/// artifacts per platform.
///
/// The serialized form is a signify-style signed document:
/// ```text
/// untrusted comment: signature from relsign secret key
/// <base64 of "Ed" || key_id(8) || signature(64)>
/// <JSON manifest body>
/// ```
/// The Ed25519 signature covers the JSON body exactly as emitted,
/// including its trailing newline. The signature block embeds the key id,
/// so verifiers can tell "signed by a different key" apart from garbage.
use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignerError};
use crate::keys::{PublicKey, SecretKey, KEY_ID_LEN, SIGNATURE_ALGORITHM};

pub const SIGNATURE_COMMENT: &str = "untrusted comment: signature from relsign secret key";

/// "Ed" || key_id || detached Ed25519 signature.
const SIGNATURE_BLOCK_LEN: usize = 2 + KEY_ID_LEN + 64;

/// One release artifact, keyed by platform in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformRelease {
    /// Download URL for the artifact.
    pub url: String,
    /// Artifact size in bytes.
    pub size: u64,
    /// Hex-encoded SHA-512 of the artifact contents.
    pub sha512: String,
}

/// An update manifest under construction or parsed back from a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Release version; must be set before the manifest can be signed.
    pub version: Option<String>,
    /// Whether clients must install this update.
    pub mandatory: bool,
    /// Release date.
    pub date: Option<DateTime<Utc>>,
    /// Per-platform artifacts.
    pub platforms: BTreeMap<String, PlatformRelease>,
}

impl Manifest {
    pub fn set_file(&mut self, platform: &str, url: &str) {
        self.platform_entry(platform).url = url.to_string();
    }

    pub fn set_size(&mut self, platform: &str, size: u64) {
        self.platform_entry(platform).size = size;
    }

    pub fn set_sha512(&mut self, platform: &str, digest: &[u8]) {
        self.platform_entry(platform).sha512 = hex::encode(digest);
    }

    fn platform_entry(&mut self, platform: &str) -> &mut PlatformRelease {
        self.platforms.entry(platform.to_string()).or_default()
    }

    /// Sign the manifest with an unlocked secret key and emit the signed
    /// document. Fails with a state error if no version has been set or
    /// the key is still locked.
    pub fn serialize(&self, secret: &SecretKey) -> Result<String> {
        if self.version.is_none() {
            return Err(SignerError::State("manifest version is not set".into()));
        }
        let signing_key = secret.signing_key()?;

        let mut body = serde_json::to_string_pretty(self)
            .map_err(|e| SignerError::Serialization(e.to_string()))?;
        body.push('\n');

        let signature = signing_key.sign(body.as_bytes());
        let mut block = [0u8; SIGNATURE_BLOCK_LEN];
        block[0..2].copy_from_slice(&SIGNATURE_ALGORITHM);
        block[2..10].copy_from_slice(secret.key_id());
        block[10..].copy_from_slice(&signature.to_bytes());

        Ok(format!("{SIGNATURE_COMMENT}\n{}\n{body}", BASE64.encode(block)))
    }

    /// Verify a signed document against a public key and parse the
    /// manifest back out of it.
    pub fn verify(public: &PublicKey, document: &str) -> Result<Manifest> {
        let mut parts = document.splitn(3, '\n');
        let bad_format = || SignerError::Format("bad manifest document format".into());
        parts.next().ok_or_else(bad_format)?;
        let block_line = parts.next().ok_or_else(bad_format)?;
        let body = parts.next().ok_or_else(bad_format)?;

        let block = BASE64.decode(block_line.trim())?;
        if block.len() != SIGNATURE_BLOCK_LEN {
            return Err(SignerError::Format(format!(
                "expected {SIGNATURE_BLOCK_LEN}-byte signature block, got {}",
                block.len()
            )));
        }
        if block[0..2] != SIGNATURE_ALGORITHM {
            return Err(SignerError::UnsupportedAlgorithm(
                "unknown signature algorithm".into(),
            ));
        }
        if block[2..10] != public.key_id()[..] {
            // Signed by some other key; its signature proves nothing here.
            return Err(SignerError::Signature);
        }

        let signature = ed25519_dalek::Signature::from_slice(&block[10..])
            .map_err(|_| SignerError::Signature)?;
        public
            .verifying_key()?
            .verify(body.as_bytes(), &signature)
            .map_err(|_| SignerError::Signature)?;

        serde_json::from_str(body).map_err(|e| SignerError::Serialization(e.to_string()))
    }
}
