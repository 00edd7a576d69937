/// Per-artifact size and digest collaborators for the signing pipeline.
///
/// Behind a trait so the pipeline can be tested against stubs without
/// touching the filesystem.
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha512};
use tokio::io::AsyncReadExt;

use crate::error::Result;

#[async_trait]
pub trait ArtifactMetrics: Send + Sync {
    /// Size of the artifact in bytes.
    async fn size(&self, path: &Path) -> Result<u64>;

    /// SHA-512 of the artifact contents.
    async fn sha512(&self, path: &Path) -> Result<[u8; 64]>;
}

/// Filesystem-backed metrics.
pub struct FsMetrics;

#[async_trait]
impl ArtifactMetrics for FsMetrics {
    async fn size(&self, path: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn sha512(&self, path: &Path) -> Result<[u8; 64]> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha512::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    #[tokio::test]
    async fn test_fs_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        let contents = b"release artifact contents";
        tokio::fs::write(&path, contents).await.unwrap();

        assert_eq!(FsMetrics.size(&path).await.unwrap(), contents.len() as u64);
        assert_eq!(FsMetrics.sha512(&path).await.unwrap(), hash::sha512(contents));
    }

    #[tokio::test]
    async fn test_fs_metrics_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");
        assert!(FsMetrics.size(&path).await.is_err());
        assert!(FsMetrics.sha512(&path).await.is_err());
    }
}
