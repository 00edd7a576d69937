/// Key file I/O.
///
/// Text format, UTF-8, two lines:
/// ```text
/// untrusted comment: <anything>
/// <base64 of the 104-byte container>
/// ```
/// The comment line is not authenticated by anything, hence the name.
use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::{Result, SignerError};
use crate::keys::{SecretKey, DEFAULT_ROUNDS};

/// Passing this as the output path streams the key file to stdout
/// instead of the filesystem.
pub const STDOUT_SENTINEL: &str = "-";

const SECRET_KEY_COMMENT: &str = "untrusted comment: relsign secret key";

/// Read a secret key file and unlock it with the given passphrase.
pub async fn read_key_file(path: impl AsRef<Path>, passphrase: &[u8]) -> Result<SecretKey> {
    let data = tokio::fs::read_to_string(path).await?;
    let mut lines = data.lines().map(str::trim);

    // First line is the untrusted comment, second is the key.
    let bad_format = || SignerError::Format("bad key file format".into());
    lines.next().ok_or_else(bad_format)?;
    let encoded = lines.next().ok_or_else(bad_format)?;

    let key = SecretKey::from_base64(encoded)?;
    key.unlock(passphrase)
}

/// Lock an unlocked secret key with the default round count and write it
/// out as a two-line key file. Fails with a state error if the key is
/// already locked.
pub async fn write_key_file(
    path: impl AsRef<Path>,
    passphrase: &[u8],
    secret: SecretKey,
) -> Result<()> {
    write_key_file_with_rounds(path, passphrase, secret, DEFAULT_ROUNDS).await
}

/// Same as `write_key_file` with an explicit KDF round count.
pub async fn write_key_file_with_rounds(
    path: impl AsRef<Path>,
    passphrase: &[u8],
    secret: SecretKey,
    rounds: u32,
) -> Result<()> {
    let locked = secret.lock_with_rounds(passphrase, rounds)?;
    let data = format!("{SECRET_KEY_COMMENT}\n{}\n", locked.to_base64());

    if path.as_ref() == Path::new(STDOUT_SENTINEL) {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(data.as_bytes()).await?;
        stdout.flush().await?;
        return Ok(());
    }

    tokio::fs::write(path, data).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        let (key, public) = SecretKey::generate();
        write_key_file_with_rounds(&path, b"hunter2", key, 4).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("untrusted comment: "));
        assert!(contents.ends_with('\n'));

        let read_back = read_key_file(&path, b"hunter2").await.unwrap();
        assert_eq!(read_back.public_key().unwrap(), public);
    }

    #[tokio::test]
    async fn test_read_with_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        let (key, _) = SecretKey::generate();
        write_key_file_with_rounds(&path, b"right", key, 4).await.unwrap();

        let err = read_key_file(&path, b"wrong").await.unwrap_err();
        assert!(matches!(err, SignerError::Checksum));
    }

    #[tokio::test]
    async fn test_read_rejects_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        tokio::fs::write(&path, "untrusted comment: nothing else\n").await.unwrap();

        let err = read_key_file(&path, b"x").await.unwrap_err();
        assert!(matches!(err, SignerError::Format(_)));
    }

    #[tokio::test]
    async fn test_read_rejects_invalid_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        tokio::fs::write(&path, "untrusted comment: key\nnot*valid*base64!\n")
            .await
            .unwrap();

        let err = read_key_file(&path, b"x").await.unwrap_err();
        assert!(matches!(err, SignerError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_write_locked_key_fails() {
        let (key, _) = SecretKey::generate();
        let locked = key.lock_with_rounds(b"p", 4).unwrap();

        let err = write_key_file_with_rounds("/nonexistent/should-not-be-written", b"p", locked, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::State(_)));
    }

    #[tokio::test]
    async fn test_write_to_stdout_sentinel() {
        let (key, _) = SecretKey::generate();
        write_key_file_with_rounds(STDOUT_SENTINEL, b"p", key, 4).await.unwrap();
    }
}
