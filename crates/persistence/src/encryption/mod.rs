//! AES-256-GCM encryption for ledger secrets (test-account passwords)
//!
//! Keys are machine-bound: Argon2id over a machine fingerprint.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use rand::Rng;
use reconciler_core::{Error, Result};

const KEY_LEN: usize = 32;
const IV_LEN: usize = 12;
const PASSPHRASE_SALT: &[u8] = b"reconciler-ledger-salt-v1";
const MACHINE_SALT: &[u8] = b"reconciler-v1-machine-salt";

fn crypto_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::EncryptionError(format!("{}: {}", context, e))
}

/// A sealed password as stored in the `accounts` table
#[derive(Debug, Clone)]
pub struct EncryptedSecret {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
}

impl EncryptedSecret {
    /// Rebuild from the `password_encrypted` / `iv` columns
    pub fn from_parts(ciphertext: Vec<u8>, iv: &[u8]) -> Result<Self> {
        match <[u8; IV_LEN]>::try_from(iv) {
            Ok(iv) => Ok(Self { ciphertext, iv }),
            Err(_) => Err(Error::EncryptionError(format!(
                "stored IV has {} bytes, expected {}",
                iv.len(),
                IV_LEN
            ))),
        }
    }
}

pub struct SecretEncryptor {
    cipher: Aes256Gcm,
}

impl SecretEncryptor {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(Error::EncryptionError(format!(
                "ledger key has {} bytes, expected {}",
                key.len(),
                KEY_LEN
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(key);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encryptor keyed to this machine; the runner's default
    pub fn for_this_machine() -> Result<Self> {
        Self::new(&derive_machine_key()?)
    }

    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        Self::new(&derive_key(passphrase.as_bytes(), PASSPHRASE_SALT)?)
    }

    /// Seal `plaintext` under a fresh random IV
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret> {
        let iv: [u8; IV_LEN] = rand::thread_rng().gen();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| crypto_error("seal failed", e))?;
        Ok(EncryptedSecret { ciphertext, iv })
    }

    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<String> {
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&secret.iv), secret.ciphertext.as_slice())
            .map_err(|e| crypto_error("open failed (wrong key or corrupt row)", e))?;
        String::from_utf8(plaintext).map_err(|e| crypto_error("secret is not UTF-8", e))
    }
}

// ─── Machine-bound key derivation ────────────────────────────────────

fn derive_key(secret: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(secret, salt, &mut key)
        .map_err(|e| crypto_error("Argon2 key derivation failed", e))?;
    Ok(key)
}

/// Machine id and hostname, with placeholders where either is missing
/// (containers often have neither).
pub fn machine_fingerprint() -> String {
    let machine_id = machine_uid::get().unwrap_or_else(|_| "no-machine-id".to_string());
    let hostname = ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("reconciler-{}-{}", machine_id, hostname)
}

/// Ledger key for this host. A ledger copied elsewhere stays sealed.
pub fn derive_machine_key() -> Result<[u8; KEY_LEN]> {
    derive_key(machine_fingerprint().as_bytes(), MACHINE_SALT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor(passphrase: &str) -> SecretEncryptor {
        SecretEncryptor::from_passphrase(passphrase).unwrap()
    }

    #[test]
    fn test_password_survives_the_ledger() {
        let enc = encryptor("ledger-pass");
        let sealed = enc.encrypt("Qa7x9Lm2Pw").unwrap();
        let stored = EncryptedSecret::from_parts(sealed.ciphertext.clone(), &sealed.iv).unwrap();
        assert_eq!(enc.decrypt(&stored).unwrap(), "Qa7x9Lm2Pw");
    }

    #[test]
    fn test_same_password_seals_differently() {
        let enc = encryptor("ledger-pass");
        let a = enc.encrypt("same").unwrap();
        let b = enc.encrypt("same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_other_key_cannot_open() {
        let sealed = encryptor("one").encrypt("secret").unwrap();
        assert!(matches!(encryptor("two").decrypt(&sealed), Err(Error::EncryptionError(_))));
    }

    #[test]
    fn test_bad_lengths_rejected() {
        assert!(SecretEncryptor::new(&[7u8; 16]).is_err());
        assert!(EncryptedSecret::from_parts(vec![1, 2, 3], &[0u8; 8]).is_err());
    }

    #[test]
    fn test_machine_key_is_stable() {
        let key = derive_machine_key().unwrap();
        assert_eq!(key, derive_machine_key().unwrap());
        assert!(key.iter().any(|&b| b != 0));

        let enc = SecretEncryptor::for_this_machine().unwrap();
        assert_eq!(enc.decrypt(&enc.encrypt("pw").unwrap()).unwrap(), "pw");
    }
}
