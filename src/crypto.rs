//! Identity cipher for card numbers.
//!
//! A plaintext card number is never persisted. `seal` produces two values:
//!
//! - a **blind index**: keyed HMAC-SHA-256 of the number, used for every
//!   equality lookup and the uniqueness constraint. One-way, never reversed.
//! - a **ciphertext**: AES-256-GCM of the number for at-rest storage, with a
//!   nonce derived from the plaintext so sealing is deterministic.
//!
//! `open` inverts the ciphertext. Round-trip law: `open(seal(x)) == x` for
//! any well-formed number. Key material comes from configuration, loaded
//! once at startup and injected at construction.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::LedgerError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;

/// Stored representation of a card number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardIdentity {
    /// Hex blind index; equality-searchable, unique per plaintext.
    pub index: String,
    /// Base64 nonce-prefixed AES-GCM ciphertext; reversible via [`IdentityCipher::open`].
    pub ciphertext: String,
}

/// Deterministic, reversible transform between plaintext card numbers and
/// their stored identity.
pub struct IdentityCipher {
    enc_key: [u8; 32],
    index_key: [u8; 32],
    nonce_key: [u8; 32],
}

impl IdentityCipher {
    /// Build a cipher from the configured secret.
    ///
    /// Three independent keys are derived from the secret so that a leaked
    /// blind index never yields the encryption key.
    pub fn new(secret: &str) -> Result<Self, LedgerError> {
        if secret.trim().is_empty() {
            return Err(LedgerError::Crypto("identity secret is empty".to_string()));
        }

        Ok(Self {
            enc_key: derive_key(secret, b"card-ledger:enc"),
            index_key: derive_key(secret, b"card-ledger:index"),
            nonce_key: derive_key(secret, b"card-ledger:nonce"),
        })
    }

    /// Seal a plaintext card number into its stored identity.
    pub fn seal(&self, plain: &str) -> Result<CardIdentity, LedgerError> {
        let index = hex::encode(keyed_mac(&self.index_key, plain.as_bytes()));

        // Synthetic nonce keeps sealing deterministic: the same number
        // always produces the same ciphertext.
        let nonce_bytes: [u8; NONCE_LEN] = keyed_mac(&self.nonce_key, plain.as_bytes())
            [..NONCE_LEN]
            .try_into()
            .map_err(|_| LedgerError::Crypto("nonce derivation failed".to_string()))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.enc_key));
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plain.as_bytes())
            .map_err(|_| LedgerError::Crypto("encryption failed".to_string()))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&sealed);

        Ok(CardIdentity {
            index,
            ciphertext: BASE64.encode(framed),
        })
    }

    /// Open a stored ciphertext back into the plaintext card number.
    pub fn open(&self, ciphertext: &str) -> Result<String, LedgerError> {
        let framed = BASE64
            .decode(ciphertext)
            .map_err(|_| LedgerError::Crypto("malformed identity: bad base64".to_string()))?;

        if framed.len() <= NONCE_LEN {
            return Err(LedgerError::Crypto("malformed identity: too short".to_string()));
        }

        let (nonce_bytes, sealed) = framed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.enc_key));
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| LedgerError::Crypto("decryption failed".to_string()))?;

        String::from_utf8(plain)
            .map_err(|_| LedgerError::Crypto("decrypted number is not valid UTF-8".to_string()))
    }

    /// Compute only the blind index for an equality lookup.
    pub fn index_of(&self, plain: &str) -> String {
        hex::encode(keyed_mac(&self.index_key, plain.as_bytes()))
    }
}

fn derive_key(secret: &str, label: &[u8]) -> [u8; 32] {
    // Qualified call: `aes_gcm::aead::KeyInit` is in scope and also offers
    // a `new_from_slice`.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(label);
    mac.finalize().into_bytes().into()
}

fn keyed_mac(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Mask a plaintext card number for external presentation.
///
/// Only the last four digits are revealed; full numbers never leave the core.
pub fn mask_card_number(plain: &str) -> String {
    if plain.len() < 4 {
        return "****".to_string();
    }
    format!("**** **** **** {}", &plain[plain.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-material";

    fn cipher() -> IdentityCipher {
        IdentityCipher::new(SECRET).expect("valid secret")
    }

    #[test]
    fn test_round_trip() {
        let c = cipher();
        for number in ["6171053773368137", "1234567890123456", "0000000000000000"] {
            let identity = c.seal(number).unwrap();
            assert_eq!(c.open(&identity.ciphertext).unwrap(), number);
        }
    }

    #[test]
    fn test_round_trip_many_numbers() {
        let c = cipher();
        for i in 0..200u64 {
            let number = format!("{:016}", i.wrapping_mul(982_451_653));
            let identity = c.seal(&number).unwrap();
            assert_eq!(c.open(&identity.ciphertext).unwrap(), number);
        }
    }

    #[test]
    fn test_seal_is_deterministic() {
        let c = cipher();
        let a = c.seal("6171053773368137").unwrap();
        let b = c.seal("6171053773368137").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.index, c.index_of("6171053773368137"));
    }

    #[test]
    fn test_distinct_numbers_distinct_identities() {
        let c = cipher();
        let a = c.seal("6171053773368137").unwrap();
        let b = c.seal("6171053773368138").unwrap();
        assert_ne!(a.index, b.index);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_different_secret_different_index() {
        let a = cipher().seal("6171053773368137").unwrap();
        let b = IdentityCipher::new("another-secret")
            .unwrap()
            .seal("6171053773368137")
            .unwrap();
        assert_ne!(a.index, b.index);
    }

    #[test]
    fn test_open_rejects_malformed_identity() {
        let c = cipher();
        assert!(matches!(c.open("not base64!!!"), Err(LedgerError::Crypto(_))));
        assert!(matches!(c.open("QQ=="), Err(LedgerError::Crypto(_))));

        // Tampered ciphertext fails authentication
        let identity = c.seal("6171053773368137").unwrap();
        let mut framed = BASE64.decode(&identity.ciphertext).unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xFF;
        let tampered = BASE64.encode(framed);
        assert!(matches!(c.open(&tampered), Err(LedgerError::Crypto(_))));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(IdentityCipher::new(""), Err(LedgerError::Crypto(_))));
        assert!(matches!(
            IdentityCipher::new("   "),
            Err(LedgerError::Crypto(_))
        ));
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(mask_card_number("6171053773368137"), "**** **** **** 8137");
        assert_eq!(mask_card_number("123"), "****");
    }
}
