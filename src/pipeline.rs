/// Manifest signing pipeline.
///
/// Coordinates the full release-signing flow:
/// 1. Unlock the secret key from its key file
/// 2. Register release artifacts (platform, local path, download URL)
/// 3. Resolve every artifact's size and SHA-512 concurrently
/// 4. Populate the manifest and sign it with the unlocked key
///
/// The size/digest reads are independent and joined before the manifest
/// is touched; nothing here races on shared state.
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::info;

use crate::artifact::ArtifactMetrics;
use crate::error::{Result, SignerError};
use crate::keys::file::read_key_file;
use crate::keys::SecretKey;
use crate::manifest::Manifest;
use crate::passphrase::PassphraseSource;

struct PendingFile {
    platform: String,
    path: PathBuf,
    url: String,
}

/// Builder for a signed update manifest.
#[derive(Default)]
pub struct ManifestMaker {
    files: Vec<PendingFile>,
    manifest: Manifest,
    secret_key: Option<SecretKey>,
}

impl ManifestMaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and unlock the secret key file. The passphrase comes from the
    /// injected source.
    pub async fn unlock_key_file(
        &mut self,
        path: impl AsRef<Path>,
        passphrase: &dyn PassphraseSource,
    ) -> Result<()> {
        let passphrase = passphrase.read_passphrase(false)?;
        let key = read_key_file(path, &passphrase).await?;
        info!(key_id = %hex::encode(key.key_id()), "secret key unlocked");
        self.secret_key = Some(key);
        Ok(())
    }

    /// Set the release version and mandatory flag; stamps the release date.
    pub fn set_version(&mut self, version: &str, mandatory: bool) {
        self.manifest.version = Some(version.to_string());
        self.manifest.mandatory = mandatory;
        self.manifest.date = Some(chrono::Utc::now());
    }

    /// Register a release artifact with an explicit download URL.
    pub fn add_file(&mut self, platform: &str, path: impl Into<PathBuf>, url: &str) {
        self.files.push(PendingFile {
            platform: platform.to_string(),
            path: path.into(),
            url: url.to_string(),
        });
    }

    /// Register an artifact that will be published as a GitHub release
    /// download. `repo` is the 'username/project' repository name. The URL
    /// embeds the release version, so this requires `set_version` first.
    pub fn add_github_file(&mut self, platform: &str, path: impl Into<PathBuf>, repo: &str) -> Result<()> {
        let version = self
            .manifest
            .version
            .as_deref()
            .ok_or_else(|| SignerError::State("add_github_file called before set_version".into()))?;

        let path: PathBuf = path.into();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SignerError::Format(format!("no usable file name in {}", path.display())))?;
        let url = format!("https://github.com/{repo}/releases/download/v{version}/{filename}");

        self.files.push(PendingFile {
            platform: platform.to_string(),
            path,
            url,
        });
        Ok(())
    }

    /// Resolve all registered artifacts and produce the signed manifest
    /// document. Requires an unlocked key and a set version.
    pub async fn generate(&mut self, metrics: &dyn ArtifactMetrics) -> Result<String> {
        let secret = self
            .secret_key
            .as_ref()
            .ok_or_else(|| SignerError::State("generate called before unlock_key_file".into()))?;
        if self.manifest.version.is_none() {
            return Err(SignerError::State("generate called before set_version".into()));
        }

        // Independent read-only lookups; join before touching the manifest.
        let resolved = try_join_all(self.files.iter().map(|file| async move {
            let size = metrics.size(&file.path).await?;
            let digest = metrics.sha512(&file.path).await?;
            Ok::<_, SignerError>((file, size, digest))
        }))
        .await?;

        for (file, size, digest) in resolved {
            self.manifest.set_file(&file.platform, &file.url);
            self.manifest.set_size(&file.platform, size);
            self.manifest.set_sha512(&file.platform, &digest);
            info!(platform = %file.platform, size, "artifact resolved");
        }

        info!(
            version = self.manifest.version.as_deref().unwrap_or_default(),
            platforms = self.manifest.platforms.len(),
            "signing manifest"
        );
        self.manifest.serialize(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactMetrics;
    use crate::crypto::hash;
    use crate::keys::file::write_key_file_with_rounds;
    use crate::keys::PublicKey;
    use crate::passphrase::StaticPassphrase;
    use async_trait::async_trait;

    /// Stub collaborator: size is the path length, digest is the SHA-512
    /// of the path string. Deterministic and filesystem-free.
    struct StubMetrics;

    #[async_trait]
    impl ArtifactMetrics for StubMetrics {
        async fn size(&self, path: &Path) -> Result<u64> {
            Ok(path.as_os_str().len() as u64)
        }

        async fn sha512(&self, path: &Path) -> Result<[u8; 64]> {
            Ok(hash::sha512(path.to_string_lossy().as_bytes()))
        }
    }

    async fn maker_with_key() -> (ManifestMaker, PublicKey) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        let (secret, public) = SecretKey::generate();
        write_key_file_with_rounds(&path, b"123", secret, 4).await.unwrap();

        let mut maker = ManifestMaker::new();
        maker
            .unlock_key_file(&path, &StaticPassphrase(b"123".to_vec()))
            .await
            .unwrap();
        (maker, public)
    }

    #[tokio::test]
    async fn test_generate_signed_manifest() {
        let (mut maker, public) = maker_with_key().await;
        maker.set_version("1.4.2", false);
        maker.add_file("linux", "/release/app.AppImage", "https://example.com/app.AppImage");
        maker.add_file("windows", "/release/app.exe", "https://example.com/app.exe");

        let document = maker.generate(&StubMetrics).await.unwrap();
        let manifest = Manifest::verify(&public, &document).unwrap();

        assert_eq!(manifest.version.as_deref(), Some("1.4.2"));
        assert_eq!(manifest.platforms.len(), 2);

        let linux = &manifest.platforms["linux"];
        assert_eq!(linux.url, "https://example.com/app.AppImage");
        assert_eq!(linux.size, "/release/app.AppImage".len() as u64);
        assert_eq!(linux.sha512, hex::encode(hash::sha512(b"/release/app.AppImage")));

        assert!(manifest.platforms.contains_key("windows"));
        assert!(manifest.date.is_some());
    }

    #[tokio::test]
    async fn test_generate_before_set_version_fails() {
        let (mut maker, _) = maker_with_key().await;
        maker.add_file("linux", "/a", "https://example.com/a");
        assert!(matches!(
            maker.generate(&StubMetrics).await.unwrap_err(),
            SignerError::State(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_before_unlock_fails() {
        let mut maker = ManifestMaker::new();
        maker.set_version("1.0.0", false);
        assert!(matches!(
            maker.generate(&StubMetrics).await.unwrap_err(),
            SignerError::State(_)
        ));
    }

    #[tokio::test]
    async fn test_add_github_file() {
        let (mut maker, public) = maker_with_key().await;
        maker.set_version("2.0.0", true);
        maker
            .add_github_file("macos", "/release/App-2.0.0.dmg", "example/app")
            .unwrap();

        let document = maker.generate(&StubMetrics).await.unwrap();
        let manifest = Manifest::verify(&public, &document).unwrap();
        assert_eq!(
            manifest.platforms["macos"].url,
            "https://github.com/example/app/releases/download/v2.0.0/App-2.0.0.dmg"
        );
    }

    #[tokio::test]
    async fn test_add_github_file_before_set_version_fails() {
        let (mut maker, _) = maker_with_key().await;
        assert!(matches!(
            maker.add_github_file("macos", "/a.dmg", "example/app").unwrap_err(),
            SignerError::State(_)
        ));
    }

    #[tokio::test]
    async fn test_unlock_with_wrong_passphrase_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        let (secret, _) = SecretKey::generate();
        write_key_file_with_rounds(&path, b"right", secret, 4).await.unwrap();

        let mut maker = ManifestMaker::new();
        let err = maker
            .unlock_key_file(&path, &StaticPassphrase(b"wrong".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::Checksum));
    }
}
