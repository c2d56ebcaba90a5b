//! Cryptographic helpers.

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

/// Deterministic public hash of an email address, usable as an avatar key.
///
/// The address is trimmed and lower-cased first so every spelling of the
/// same mailbox gives the same hash.
pub fn email_hash(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a candidate with every accepted secret without stopping at the
/// first match.
pub fn matches_any<'a>(
    candidate: &[u8],
    accepted: impl IntoIterator<Item = &'a [u8]>,
) -> bool {
    accepted
        .into_iter()
        .fold(false, |found, secret| constant_time_eq(candidate, secret) | found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_hash() {
        let hash = email_hash("abc1@email.com");
        assert_eq!(hash, email_hash("abc1@email.com"));
        assert_eq!(hash, email_hash("  ABC1@Email.com"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_inputs() {
        assert_ne!(email_hash("test1@example.com"), email_hash("test2@example.com"));
    }

    #[test]
    fn test_matches_any() {
        let accepted = ["wm:secret", "other:pass"];
        let accepted = || accepted.iter().map(|s| s.as_bytes());
        assert!(matches_any(b"wm:secret", accepted()));
        assert!(matches_any(b"other:pass", accepted()));
        assert!(!matches_any(b"wrong:string", accepted()));
        assert!(!matches_any(b"wm:secre", accepted()));
        assert!(!matches_any(b"", std::iter::empty()));
    }
}
