/// Wrappers for sensitive key material that is automatically zeroized on drop.
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 64-byte sensitive value (Ed25519 seed + public half) that is
/// zeroized when dropped. The buffer is exclusively owned; lock/unlock
/// transformations clone it into a fresh buffer rather than mutating
/// shared bytes in place.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes64([u8; 64]);

impl SensitiveBytes64 {
    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(slice);
        Some(Self(bytes))
    }

    /// XOR this buffer with a mask, returning a new owned buffer.
    pub fn xor(&self, mask: &[u8]) -> Self {
        debug_assert_eq!(mask.len(), 64);
        let mut out = self.0;
        for (b, m) in out.iter_mut().zip(mask) {
            *b ^= m;
        }
        Self(out)
    }
}

impl AsRef<[u8]> for SensitiveBytes64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_bytes64() {
        let key = SensitiveBytes64::new([0xAA; 64]);
        assert_eq!(key.as_bytes(), &[0xAA; 64]);
    }

    #[test]
    fn test_from_slice() {
        assert!(SensitiveBytes64::from_slice(&[0u8; 64]).is_some());
        assert!(SensitiveBytes64::from_slice(&[0u8; 32]).is_none());
    }

    #[test]
    fn test_xor_is_involution() {
        let key = SensitiveBytes64::new([0x5Au8; 64]);
        let mask = [0xC3u8; 64];
        let masked = key.xor(&mask);
        assert_ne!(masked.as_bytes(), key.as_bytes());
        assert_eq!(masked.xor(&mask).as_bytes(), key.as_bytes());
    }
}
