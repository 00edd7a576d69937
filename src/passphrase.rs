/// Passphrase acquisition.
///
/// Callers inject a `PassphraseSource` into unlock/lock call sites instead
/// of reaching for ambient globals, so tests and scripts can supply a
/// fixed passphrase while the CLI prompts interactively.
use zeroize::Zeroizing;

use crate::error::{Result, SignerError};

/// Environment variable consulted before prompting.
pub const PASSPHRASE_ENV: &str = "RELSIGN_PASSPHRASE";

pub trait PassphraseSource {
    /// Obtain a passphrase. With `confirm` set, the source must ask twice
    /// (where that makes sense) and fail on mismatch.
    fn read_passphrase(&self, confirm: bool) -> Result<Zeroizing<Vec<u8>>>;
}

/// Default chain: `RELSIGN_PASSPHRASE` if set, interactive prompt otherwise.
pub struct EnvThenPrompt;

impl PassphraseSource for EnvThenPrompt {
    fn read_passphrase(&self, confirm: bool) -> Result<Zeroizing<Vec<u8>>> {
        if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
            return Ok(Zeroizing::new(value.into_bytes()));
        }

        let first = Zeroizing::new(rpassword::prompt_password("Passphrase: ")?);
        if confirm {
            let second = Zeroizing::new(rpassword::prompt_password("Confirm: ")?);
            if *first != *second {
                return Err(SignerError::PassphraseMismatch);
            }
        }
        Ok(Zeroizing::new(first.as_bytes().to_vec()))
    }
}

/// Fixed passphrase, for tests and non-interactive callers.
pub struct StaticPassphrase(pub Vec<u8>);

impl PassphraseSource for StaticPassphrase {
    fn read_passphrase(&self, _confirm: bool) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_passphrase() {
        let source = StaticPassphrase(b"123".to_vec());
        assert_eq!(*source.read_passphrase(false).unwrap(), b"123");
        assert_eq!(*source.read_passphrase(true).unwrap(), b"123");
    }

    #[test]
    fn test_env_source() {
        std::env::set_var(PASSPHRASE_ENV, "from-env");
        let source = EnvThenPrompt;
        assert_eq!(*source.read_passphrase(false).unwrap(), b"from-env");
        std::env::remove_var(PASSPHRASE_ENV);
    }
}
