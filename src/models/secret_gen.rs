use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Default robot secret prefix
pub const DEFAULT_SECRET_PREFIX: &str = "rbt_";

/// Number of random bytes behind every secret (256 bits of entropy).
const SECRET_BYTES: usize = 32;

/// Source of opaque bearer secrets.
///
/// Called exactly once per issued credential. Nothing in this crate parses
/// the returned value; it is only hashed for storage and handed back once.
pub trait SecretGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random URL-safe secrets with a fixed prefix.
#[derive(Debug, Clone)]
pub struct RandomSecretGenerator {
    prefix: String,
}

impl RandomSecretGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RandomSecretGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_PREFIX)
    }
}

impl SecretGenerator for RandomSecretGenerator {
    fn generate(&self) -> String {
        let mut random_bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill(&mut random_bytes);

        let random_part = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);
        format!("{}{}", self.prefix, random_part)
    }
}

/// SHA-256 of a secret, hex-encoded. This is the only form that is stored.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        let secret = RandomSecretGenerator::default().generate();

        assert!(secret.starts_with(DEFAULT_SECRET_PREFIX));
        // 32 bytes in base64 without padding is 43 characters
        assert_eq!(secret.len(), DEFAULT_SECRET_PREFIX.len() + 43);
    }

    #[test]
    fn test_generate_custom_prefix() {
        let secret = RandomSecretGenerator::new("ci_").generate();
        assert!(secret.starts_with("ci_"));
        assert_eq!(secret.len(), 3 + 43);
    }

    #[test]
    fn test_generate_unique() {
        let generator = RandomSecretGenerator::default();
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let a = hash_secret("rbt_test123");
        let b = hash_secret("rbt_test123");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, hash_secret("rbt_test124"));
    }
}
