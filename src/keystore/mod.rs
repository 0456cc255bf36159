//! The underlying keyed container and its provider machinery.
//!
//! The credential store sits on top of a conventional key store: a keyed
//! container that natively holds only secret-key, private-key-with-chain
//! and trusted-certificate entries. The container is reached through the
//! [`KeyStoreEngine`] trait so that alternative engines can be plugged in;
//! engines are looked up by type name through [`KeyStoreProvider`]s, with
//! the built-in sealed engine as the default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod sealed;

pub use sealed::{SealedKeyStore, SealedKeyStoreProvider};

/// The engine type used when the configuration names none.
pub const DEFAULT_KEY_STORE_TYPE: &str = SealedKeyStore::TYPE;

/// Errors raised by an underlying key store engine.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// An I/O failure while reading or writing the container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The container bytes are not in the engine's format.
    #[error("malformed container: {0}")]
    Corrupted(String),

    /// The container's integrity check failed, usually a wrong password.
    #[error("container integrity check failed")]
    IntegrityCheckFailed,

    /// The container is sealed and no password was supplied.
    #[error("a password is required to open this container")]
    PasswordRequired,

    /// Sealing the container failed.
    #[error("container sealing failed: {0}")]
    Seal(String),

    /// The container format version is newer than this engine understands.
    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u32),

    /// No provider recognizes the requested engine type.
    #[error("unknown key store type '{0}'")]
    UnknownType(String),
}

/// An entry of the underlying container.
///
/// These are the only shapes a conventional key store accepts; the
/// credential codec maps every credential variant onto one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStoreEntry {
    /// An opaque secret key tagged with an algorithm name.
    SecretKey {
        /// The key algorithm, or the synthetic `data` OID for encoded
        /// credentials.
        algorithm: String,
        /// The raw key bytes.
        key: Vec<u8>,
    },
    /// A private key with its certificate chain.
    PrivateKeyChain {
        /// The private key's PKCS#8 DER bytes.
        private_key: Vec<u8>,
        /// The certificate chain, end-entity first, as DER bytes.
        chain: Vec<Vec<u8>>,
    },
    /// A trusted certificate.
    TrustedCertificate {
        /// The certificate's DER bytes.
        certificate: Vec<u8>,
    },
}

impl KeyStoreEntry {
    /// Returns a short human-readable name of the entry kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SecretKey { .. } => "secret key",
            Self::PrivateKeyChain { .. } => "private key",
            Self::TrustedCertificate { .. } => "trusted certificate",
        }
    }
}

/// A keyed container of cryptographic entries.
///
/// Engines own only in-memory state; reading and writing the backing file
/// is the credential store's business, which hands serialized bytes in and
/// out of `load` and `save`.
pub trait KeyStoreEngine: Send + Sync {
    /// Resets the engine from serialized container bytes, or to empty when
    /// no bytes are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed or the integrity check
    /// against the password fails.
    fn load(&mut self, data: Option<&[u8]>, password: Option<&[u8]>) -> Result<(), KeyStoreError>;

    /// Serializes the container, protecting it with the password when one
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or sealing fails.
    fn save(&mut self, password: Option<&[u8]>) -> Result<Vec<u8>, KeyStoreError>;

    /// Returns every alias present in the container.
    fn aliases(&self) -> Vec<String>;

    /// Tests whether an alias is present.
    fn contains_alias(&self, alias: &str) -> bool;

    /// Fetches an entry by alias.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be recovered.
    fn get_entry(
        &self,
        alias: &str,
        protection: Option<&[u8]>,
    ) -> Result<Option<KeyStoreEntry>, KeyStoreError>;

    /// Places an entry under an alias, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be stored.
    fn set_entry(
        &mut self,
        alias: &str,
        entry: KeyStoreEntry,
        protection: Option<&[u8]>,
    ) -> Result<(), KeyStoreError>;

    /// Deletes the entry under an alias; deleting a missing alias is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_entry(&mut self, alias: &str) -> Result<(), KeyStoreError>;
}

/// Creates key store engines by type name.
pub trait KeyStoreProvider: Send + Sync {
    /// Returns a fresh engine for the type, or `None` when this provider
    /// does not recognize it.
    fn create(&self, store_type: &str) -> Option<Box<dyn KeyStoreEngine>>;
}

/// Resolves an engine type against caller-supplied providers, falling back
/// to the built-in provider.
pub(crate) fn create_engine(
    store_type: &str,
    providers: &[std::sync::Arc<dyn KeyStoreProvider>],
) -> Result<Box<dyn KeyStoreEngine>, KeyStoreError> {
    providers
        .iter()
        .find_map(|provider| provider.create(store_type))
        .or_else(|| SealedKeyStoreProvider.create(store_type))
        .ok_or_else(|| KeyStoreError::UnknownType(store_type.to_string()))
}
