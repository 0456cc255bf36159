//! The built-in sealed container engine.
//!
//! Entries live in memory and serialize with `bincode`. With a password,
//! the serialized body is sealed with XChaCha20-Poly1305 under a key
//! derived from the password by HKDF-SHA256 with a random salt; without
//! one, the body is written in the clear. Either way the file opens with a
//! magic tag and format version, so foreign files are rejected before any
//! cryptography runs.
//!
//! Protection is container-granular: per-entry protection bytes are
//! accepted by the trait and ignored here.

use std::collections::HashMap;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{KeyStoreEngine, KeyStoreEntry, KeyStoreError, KeyStoreProvider};

const MAGIC: &[u8; 8] = b"CREDSEAL";
const FORMAT_VERSION: u32 = 1;
const FLAG_PLAIN: u8 = 0;
const FLAG_SEALED: u8 = 1;
const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 24;
const HEADER_SIZE: usize = MAGIC.len() + 4 + 1;

/// Domain separation label for the container key derivation.
const SEAL_INFO: &[u8] = b"credstore:container-seal";

/// The built-in container engine.
#[derive(Debug, Default)]
pub struct SealedKeyStore {
    entries: HashMap<String, KeyStoreEntry>,
}

impl SealedKeyStore {
    /// The type name this engine registers under.
    pub const TYPE: &'static str = "sealed";

    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the container.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the container holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyStoreEngine for SealedKeyStore {
    fn load(&mut self, data: Option<&[u8]>, password: Option<&[u8]>) -> Result<(), KeyStoreError> {
        let Some(data) = data else {
            self.entries.clear();
            return Ok(());
        };

        if data.len() < HEADER_SIZE || &data[..MAGIC.len()] != MAGIC {
            return Err(KeyStoreError::Corrupted(
                "missing container magic".to_string(),
            ));
        }
        let version = u32::from_le_bytes(
            data[MAGIC.len()..MAGIC.len() + 4]
                .try_into()
                .expect("fixed-size slice"),
        );
        if version != FORMAT_VERSION {
            return Err(KeyStoreError::UnsupportedVersion(version));
        }
        let flag = data[HEADER_SIZE - 1];
        let body = &data[HEADER_SIZE..];

        let entries = match flag {
            FLAG_PLAIN => deserialize_entries(body)?,
            FLAG_SEALED => {
                let password = password.ok_or(KeyStoreError::PasswordRequired)?;
                if body.len() < SALT_SIZE + NONCE_SIZE {
                    return Err(KeyStoreError::Corrupted(
                        "sealed body shorter than its header".to_string(),
                    ));
                }
                let (salt, rest) = body.split_at(SALT_SIZE);
                let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

                let mut key = derive_seal_key(password, salt);
                let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
                let plaintext = cipher
                    .decrypt(XNonce::from_slice(nonce), ciphertext)
                    .map_err(|_| KeyStoreError::IntegrityCheckFailed);
                key.zeroize();
                deserialize_entries(&plaintext?)?
            }
            other => {
                return Err(KeyStoreError::Corrupted(format!(
                    "unknown container flag {other}"
                )));
            }
        };

        self.entries = entries;
        Ok(())
    }

    fn save(&mut self, password: Option<&[u8]>) -> Result<Vec<u8>, KeyStoreError> {
        let body = bincode::serialize(&self.entries)
            .map_err(|e| KeyStoreError::Serialization(e.to_string()))?;

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len() + SALT_SIZE + NONCE_SIZE + 16);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());

        match password {
            None => {
                out.push(FLAG_PLAIN);
                out.extend_from_slice(&body);
            }
            Some(password) => {
                out.push(FLAG_SEALED);

                let mut salt = [0u8; SALT_SIZE];
                getrandom::getrandom(&mut salt).expect("getrandom failed");
                let mut nonce = [0u8; NONCE_SIZE];
                getrandom::getrandom(&mut nonce).expect("getrandom failed");

                let mut key = derive_seal_key(password, &salt);
                let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
                let ciphertext = cipher
                    .encrypt(XNonce::from_slice(&nonce), body.as_slice())
                    .map_err(|_| KeyStoreError::Seal("container encryption failed".to_string()));
                key.zeroize();

                out.extend_from_slice(&salt);
                out.extend_from_slice(&nonce);
                out.extend_from_slice(&ciphertext?);
            }
        }
        Ok(out)
    }

    fn aliases(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn get_entry(
        &self,
        alias: &str,
        _protection: Option<&[u8]>,
    ) -> Result<Option<KeyStoreEntry>, KeyStoreError> {
        Ok(self.entries.get(alias).cloned())
    }

    fn set_entry(
        &mut self,
        alias: &str,
        entry: KeyStoreEntry,
        _protection: Option<&[u8]>,
    ) -> Result<(), KeyStoreError> {
        self.entries.insert(alias.to_string(), entry);
        Ok(())
    }

    fn delete_entry(&mut self, alias: &str) -> Result<(), KeyStoreError> {
        self.entries.remove(alias);
        Ok(())
    }
}

/// Provider for the built-in sealed engine.
#[derive(Debug, Default)]
pub struct SealedKeyStoreProvider;

impl KeyStoreProvider for SealedKeyStoreProvider {
    fn create(&self, store_type: &str) -> Option<Box<dyn KeyStoreEngine>> {
        store_type
            .eq_ignore_ascii_case(SealedKeyStore::TYPE)
            .then(|| Box::new(SealedKeyStore::new()) as Box<dyn KeyStoreEngine>)
    }
}

fn derive_seal_key(password: &[u8], salt: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), password);
    let mut key = [0u8; 32];
    hkdf.expand(SEAL_INFO, &mut key)
        .expect("32 bytes is a valid HKDF output length");
    key
}

fn deserialize_entries(body: &[u8]) -> Result<HashMap<String, KeyStoreEntry>, KeyStoreError> {
    bincode::deserialize(body).map_err(|e| KeyStoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> KeyStoreEntry {
        KeyStoreEntry::SecretKey {
            algorithm: "aes".to_string(),
            key: vec![0x42; 16],
        }
    }

    #[test]
    fn test_plain_save_load_round_trip() {
        let mut store = SealedKeyStore::new();
        store.set_entry("alias1", sample_entry(), None).unwrap();
        let bytes = store.save(None).unwrap();

        let mut reopened = SealedKeyStore::new();
        reopened.load(Some(&bytes), None).unwrap();
        assert_eq!(
            reopened.get_entry("alias1", None).unwrap(),
            Some(sample_entry())
        );
    }

    #[test]
    fn test_sealed_save_load_round_trip() {
        let mut store = SealedKeyStore::new();
        store.set_entry("alias1", sample_entry(), None).unwrap();
        let bytes = store.save(Some(b"secret")).unwrap();

        let mut reopened = SealedKeyStore::new();
        reopened.load(Some(&bytes), Some(b"secret")).unwrap();
        assert_eq!(
            reopened.get_entry("alias1", None).unwrap(),
            Some(sample_entry())
        );
    }

    #[test]
    fn test_wrong_password_fails_integrity() {
        let mut store = SealedKeyStore::new();
        store.set_entry("alias1", sample_entry(), None).unwrap();
        let bytes = store.save(Some(b"secret")).unwrap();

        let mut reopened = SealedKeyStore::new();
        assert!(matches!(
            reopened.load(Some(&bytes), Some(b"wrong")),
            Err(KeyStoreError::IntegrityCheckFailed)
        ));
        assert!(matches!(
            reopened.load(Some(&bytes), None),
            Err(KeyStoreError::PasswordRequired)
        ));
    }

    #[test]
    fn test_foreign_bytes_rejected() {
        let mut store = SealedKeyStore::new();
        assert!(matches!(
            store.load(Some(b"not a container at all"), None),
            Err(KeyStoreError::Corrupted(_))
        ));
    }

    #[test]
    fn test_load_empty_resets() {
        let mut store = SealedKeyStore::new();
        store.set_entry("alias1", sample_entry(), None).unwrap();
        store.load(None, None).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_alias_is_no_op() {
        let mut store = SealedKeyStore::new();
        store.delete_entry("ghost").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_entry_replaces() {
        let mut store = SealedKeyStore::new();
        store.set_entry("alias1", sample_entry(), None).unwrap();
        let replacement = KeyStoreEntry::TrustedCertificate {
            certificate: vec![1, 2, 3],
        };
        store.set_entry("alias1", replacement.clone(), None).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_entry("alias1", None).unwrap(), Some(replacement));
    }
}
