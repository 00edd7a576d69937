pub mod artifact;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod passphrase;
pub mod pipeline;
