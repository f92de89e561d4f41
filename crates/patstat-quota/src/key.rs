//! Caller identity keys.

use std::fmt;
use std::net::IpAddr;

use sha2::{Digest, Sha256};

/// A privacy-preserving caller identity.
///
/// Raw credentials are never stored; the key is the SHA-256 hex digest of
/// either the credential or, for anonymous traffic, the client IP. Anonymous
/// callers behind a shared IP therefore share one quota, which bounds them
/// coarsely but still bounds them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerKey(String);

impl CallerKey {
    /// Derives a key from an API credential.
    #[must_use]
    pub fn from_credential(credential: &str) -> Self {
        Self(hash_hex(credential.as_bytes()))
    }

    /// Derives a key from a client IP, for traffic without a credential.
    #[must_use]
    pub fn from_ip(addr: IpAddr) -> Self {
        Self(hash_hex(addr.to_string().as_bytes()))
    }

    /// Returns the hex digest backing this key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_key_is_stable() {
        let a = CallerKey::from_credential("secret-123");
        let b = CallerKey::from_credential("secret-123");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_distinct_credentials_yield_distinct_keys() {
        let a = CallerKey::from_credential("secret-1");
        let b = CallerKey::from_credential("secret-2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_never_contains_the_credential() {
        let key = CallerKey::from_credential("plaintext-secret");
        assert!(!key.as_str().contains("plaintext"));
    }

    #[test]
    fn test_ip_key() {
        let a = CallerKey::from_ip("192.0.2.1".parse().unwrap());
        let b = CallerKey::from_ip("192.0.2.1".parse().unwrap());
        let c = CallerKey::from_ip("192.0.2.2".parse().unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
