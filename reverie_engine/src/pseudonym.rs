//! Pseudonymous vendor keys.
//!
//! Offers are filed on a post under a key derived from the vendor's e-mail, so that a client browsing offers learns
//! nothing about who made them. The engine can map a key back to the vendor when it needs to touch their inventory.
//!
//! Keys are `hex(nonce || ciphertext)`, where the ciphertext is the e-mail sealed with ChaCha20-Poly1305 under a
//! deployment-wide key and nonce. The nonce is fixed, so the same vendor always gets the same key.
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;
use thiserror::Error;

use crate::db_types::VendorKey;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDecodeError {
    #[error("The vendor key is not valid hex. {0}")]
    NotHex(String),
    #[error("The vendor key is not in canonical lowercase form")]
    NotCanonical,
    #[error("The vendor key is too short to hold an identity")]
    TooShort,
    #[error("The vendor key was not issued by this deployment")]
    ForeignNonce,
    #[error("The vendor key failed authentication")]
    AuthenticationFailed,
    #[error("The vendor key does not decode to a valid identity")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PseudonymError {
    #[error("Invalid pseudonym configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Could not derive a vendor key: {0}")]
    Encryption(String),
}

#[derive(Clone)]
pub struct PseudonymScheme {
    cipher: ChaCha20Poly1305,
    nonce: [u8; NONCE_LEN],
}

impl std::fmt::Debug for PseudonymScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PseudonymScheme(****)")
    }
}

impl PseudonymScheme {
    pub fn new(key: [u8; KEY_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        Self { cipher, nonce }
    }

    /// Builds the scheme from hex-encoded key (32 bytes) and nonce (12 bytes) strings.
    pub fn from_hex(key_hex: &str, nonce_hex: &str) -> Result<Self, PseudonymError> {
        let key = decode_fixed::<KEY_LEN>(key_hex, "key")?;
        let nonce = decode_fixed::<NONCE_LEN>(nonce_hex, "nonce")?;
        Ok(Self::new(key, nonce))
    }

    /// Fresh random `(key_hex, nonce_hex)` values for a new deployment.
    pub fn generate_config() -> (String, String) {
        let mut key = [0u8; KEY_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut nonce);
        (hex::encode(key), hex::encode(nonce))
    }

    pub fn key_for(&self, identity: &str) -> Result<VendorKey, PseudonymError> {
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&self.nonce), identity.as_bytes())
            .map_err(|e| PseudonymError::Encryption(e.to_string()))?;
        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&self.nonce);
        token.extend_from_slice(&ciphertext);
        Ok(VendorKey(hex::encode(token)))
    }

    /// Maps a key back to the identity it was issued for. Only the exact form [`Self::key_for`] produces is
    /// accepted: keys are compared as strings in storage, so an uppercase spelling would name a different offer.
    pub fn identity_for(&self, key: &VendorKey) -> Result<String, KeyDecodeError> {
        if key.as_str().bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(KeyDecodeError::NotCanonical);
        }
        let bytes = hex::decode(key.as_str()).map_err(|e| KeyDecodeError::NotHex(e.to_string()))?;
        // An empty identity seals to the tag alone
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(KeyDecodeError::TooShort);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        if nonce != self.nonce {
            return Err(KeyDecodeError::ForeignNonce);
        }
        let plaintext =
            self.cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| KeyDecodeError::AuthenticationFailed)?;
        String::from_utf8(plaintext).map_err(|_| KeyDecodeError::NotUtf8)
    }
}

fn decode_fixed<const N: usize>(value: &str, what: &str) -> Result<[u8; N], PseudonymError> {
    let bytes = hex::decode(value.trim())
        .map_err(|e| PseudonymError::InvalidConfiguration(format!("The {what} is not valid hex. {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        PseudonymError::InvalidConfiguration(format!("The {what} must be {N} bytes long, but is {} bytes", b.len()))
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn scheme() -> PseudonymScheme {
        PseudonymScheme::new([7u8; KEY_LEN], [3u8; NONCE_LEN])
    }

    #[test]
    fn keys_are_deterministic_and_reversible() {
        let s = scheme();
        let k1 = s.key_for("vendor@example.com").unwrap();
        let k2 = s.key_for("vendor@example.com").unwrap();
        assert_eq!(k1, k2);
        assert_ne!(k1, s.key_for("other@example.com").unwrap());
        assert!(k1.as_str().starts_with(&hex::encode([3u8; NONCE_LEN])));
        assert_eq!(s.identity_for(&k1).unwrap(), "vendor@example.com");
    }

    #[test]
    fn foreign_keys_are_rejected() {
        let ours = scheme();
        let same_nonce = PseudonymScheme::new([8u8; KEY_LEN], [3u8; NONCE_LEN]);
        let other_nonce = PseudonymScheme::new([7u8; KEY_LEN], [4u8; NONCE_LEN]);
        let key = same_nonce.key_for("vendor@example.com").unwrap();
        assert_eq!(ours.identity_for(&key), Err(KeyDecodeError::AuthenticationFailed));
        let key = other_nonce.key_for("vendor@example.com").unwrap();
        assert_eq!(ours.identity_for(&key), Err(KeyDecodeError::ForeignNonce));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let s = scheme();
        assert!(matches!(s.identity_for(&VendorKey::from("not hex!")), Err(KeyDecodeError::NotHex(_))));
        assert_eq!(s.identity_for(&VendorKey::from("0303")), Err(KeyDecodeError::TooShort));
        let mut key = s.key_for("vendor@example.com").unwrap().0;
        let last = key.pop().unwrap();
        key.push(if last == '0' { '1' } else { '0' });
        assert_eq!(s.identity_for(&VendorKey(key)), Err(KeyDecodeError::AuthenticationFailed));
    }

    #[test]
    fn empty_identities_round_trip() {
        let s = scheme();
        let key = s.key_for("").unwrap();
        assert_eq!(key.as_str().len(), 2 * (NONCE_LEN + TAG_LEN));
        assert_eq!(s.identity_for(&key).unwrap(), "");
        let truncated = VendorKey(key.as_str()[..key.as_str().len() - 2].to_string());
        assert_eq!(s.identity_for(&truncated), Err(KeyDecodeError::TooShort));
    }

    #[test]
    fn uppercase_keys_are_rejected() {
        let s = scheme();
        let key = s.key_for("vendor@example.com").unwrap();
        let shouted = VendorKey(key.as_str().to_ascii_uppercase());
        assert_ne!(shouted, key);
        assert_eq!(s.identity_for(&shouted), Err(KeyDecodeError::NotCanonical));
        assert_eq!(s.identity_for(&key).unwrap(), "vendor@example.com");
    }

    #[test]
    fn config_from_hex() {
        let (key, nonce) = PseudonymScheme::generate_config();
        assert_eq!(key.len(), 2 * KEY_LEN);
        assert_eq!(nonce.len(), 2 * NONCE_LEN);
        let s = PseudonymScheme::from_hex(&key, &nonce).unwrap();
        let k = s.key_for("a@b.c").unwrap();
        assert_eq!(s.identity_for(&k).unwrap(), "a@b.c");
        assert!(PseudonymScheme::from_hex("abcd", &nonce).is_err());
        assert!(PseudonymScheme::from_hex(&key, "zz").is_err());
    }
}
