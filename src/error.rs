use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Malformed key container: {0}")]
    Format(String),

    #[error("Invalid base64 encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Key checksum verification failure")]
    Checksum,

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Passphrases do not match")]
    PassphraseMismatch,

    #[error("Signature verification failed")]
    Signature,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SignerError>;
