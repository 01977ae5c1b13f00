//! Hashing helpers for store keys.

use sha2::{Digest, Sha256};

/// Computes SHA-256 of the input and returns it as lowercase hex.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex("test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_bounded_length_for_arbitrary_keys() {
        for key in ["", "key-A", "пароль", &"a".repeat(10_000), "bill:7:with:colons"] {
            let digest = sha256_hex(key);
            assert_eq!(digest.len(), 64);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_distinct_keys_distinct_digests() {
        assert_ne!(sha256_hex("key-A"), sha256_hex("key-B"));
    }
}
