//! The credential store facade.
//!
//! `KeyStoreCredentialStore` overlays the multi-credential model on a
//! conventional keyed container: `store` encodes a credential, mints its
//! composite alias and places the entry; `retrieve` resolves a possibly
//! partial identity through the in-memory index and decodes the entry it
//! finds; `initialize` rebuilds that index from the container, skipping
//! entries it does not recognize.
//!
//! One reader-writer lock serializes structural operations: `retrieve` and
//! `aliases` share it, every mutating operation takes it exclusively. The
//! backing file is only touched inside `initialize` and `flush`, and
//! `flush` replaces it atomically through a sibling temporary file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use zeroize::Zeroizing;

use crate::alias::{self, AliasDecodeError};
use crate::codec::{self, CodecError};
use crate::credential::{Credential, CredentialTypeQuery};
use crate::error::{CredentialStoreError, FlushError, Result};
use crate::index::CredentialIndex;
use crate::keystore::{
    create_engine, KeyStoreEngine, KeyStoreError, KeyStoreProvider, DEFAULT_KEY_STORE_TYPE,
};
use crate::params::{AlgorithmParameters, ParamKey};
use crate::protection::{resolve_password, ProtectionParameter};

/// The configuration attribute names recognized by [`initialize`].
///
/// Unknown attributes are ignored.
///
/// [`initialize`]: KeyStoreCredentialStore::initialize
pub mod attributes {
    /// Filesystem path to persist to; absent means in-memory only.
    pub const LOCATION: &str = "location";
    /// Whether `store` and `remove` are permitted. Defaults to `true`.
    pub const MODIFIABLE: &str = "modifiable";
    /// Create an empty container when `location` is absent on disk.
    /// Defaults to `false`.
    pub const CREATE: &str = "create";
    /// Which underlying container engine to use.
    pub const KEY_STORE_TYPE: &str = "keyStoreType";
}

/// A credential store backed by a conventional key store.
///
/// Several credentials may coexist under one user-supplied alias as long
/// as they differ in type, algorithm or parameters; the composite identity
/// is packed into the underlying container alias.
///
/// # Example
///
/// ```no_run
/// use std::collections::HashMap;
/// use credstore::credential::Credential;
/// use credstore::password::PasswordCredential;
/// use credstore::store::{attributes, KeyStoreCredentialStore};
///
/// # fn main() -> credstore::error::Result<()> {
/// let mut config = HashMap::new();
/// config.insert(attributes::LOCATION.to_string(), "/var/lib/app/creds".to_string());
/// config.insert(attributes::CREATE.to_string(), "true".to_string());
///
/// let store = KeyStoreCredentialStore::new();
/// store.initialize(&config, None, &[])?;
/// store.store(
///     "db1",
///     &Credential::Password(PasswordCredential::clear("hunter2")),
///     None,
/// )?;
/// store.flush()?;
/// # Ok(())
/// # }
/// ```
pub struct KeyStoreCredentialStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    initialized: bool,
    modifiable: bool,
    location: Option<PathBuf>,
    protection: Option<ProtectionParameter>,
    keystore: Option<Box<dyn KeyStoreEngine>>,
    index: CredentialIndex,
}

impl KeyStoreCredentialStore {
    /// Creates an uninitialized store; every operation except
    /// [`initialize`](Self::initialize) fails until it is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Opens the store against its configuration.
    ///
    /// Reads the container from `location` when the file exists, starts
    /// empty when `create` is set, and rebuilds the credential index from
    /// the container's aliases. Entries whose alias does not match the
    /// store's grammar are logged and skipped, never touched.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::AutomaticCreationDisabled`] when no
    /// file exists and `create` is unset,
    /// [`CredentialStoreError::CannotInitialize`] for I/O and integrity
    /// failures, and
    /// [`CredentialStoreError::InvalidProtectionParameter`] when the
    /// protection parameter is not an accepted shape.
    pub fn initialize(
        &self,
        attributes: &HashMap<String, String>,
        protection: Option<ProtectionParameter>,
        providers: &[Arc<dyn KeyStoreProvider>],
    ) -> Result<()> {
        let mut inner = self.write_inner();
        inner.initialized = false;
        inner.index.clear();

        let modifiable = attributes
            .get(self::attributes::MODIFIABLE)
            .map_or(true, |v| parse_bool(v));
        let create = attributes
            .get(self::attributes::CREATE)
            .map_or(false, |v| parse_bool(v));
        let location = attributes.get(self::attributes::LOCATION).map(PathBuf::from);
        let store_type = attributes
            .get(self::attributes::KEY_STORE_TYPE)
            .map_or(DEFAULT_KEY_STORE_TYPE, String::as_str);

        let mut engine =
            create_engine(store_type, providers).map_err(CredentialStoreError::CannotInitialize)?;
        let password = resolve_password(protection.as_ref())?;

        match &location {
            Some(path) if path.exists() => {
                let bytes = fs::read(path)
                    .map_err(|e| CredentialStoreError::CannotInitialize(KeyStoreError::Io(e)))?;
                engine
                    .load(Some(&bytes), password_bytes(&password))
                    .map_err(CredentialStoreError::CannotInitialize)?;
            }
            _ if create => engine
                .load(None, password_bytes(&password))
                .map_err(CredentialStoreError::CannotInitialize)?,
            _ => {
                return Err(CredentialStoreError::AutomaticCreationDisabled { location });
            }
        }

        let mut index = CredentialIndex::new();
        for ks_alias in engine.aliases() {
            let ks_alias = ks_alias.to_lowercase();
            match alias::decode(&ks_alias) {
                Ok(decoded) => {
                    index.insert(
                        decoded.alias,
                        decoded.credential_type,
                        decoded.algorithm,
                        decoded.parameters.map(ParamKey::new),
                        ks_alias,
                    );
                }
                Err(AliasDecodeError::Unrecognized | AliasDecodeError::UnknownType(_)) => {
                    log::warn!("ignoring unrecognized key store entry '{ks_alias}'");
                }
                Err(AliasDecodeError::Parameters(error)) => {
                    log::warn!("failed to read key store entry '{ks_alias}': {error}");
                }
            }
        }

        inner.modifiable = modifiable;
        inner.location = location;
        inner.protection = protection;
        inner.keystore = Some(engine);
        inner.index = index;
        inner.initialized = true;
        Ok(())
    }

    /// Returns whether `store` and `remove` are permitted.
    #[must_use]
    pub fn is_modifiable(&self) -> bool {
        self.read_inner().modifiable
    }

    /// Stores a credential under an alias, replacing any credential with
    /// the same type, algorithm and parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::UnsupportedCredential`] when the
    /// credential is outside the closed set,
    /// [`CredentialStoreError::NonModifiable`] on a read-only store, and
    /// [`CredentialStoreError::CannotWrite`] when encoding or the
    /// underlying placement fails.
    pub fn store(
        &self,
        credential_alias: &str,
        credential: &Credential,
        protection: Option<&ProtectionParameter>,
    ) -> Result<()> {
        let mut inner = self.write_inner();
        let inner = &mut *inner;
        if !inner.initialized {
            return Err(CredentialStoreError::NotInitialized);
        }
        if !inner.modifiable {
            return Err(CredentialStoreError::NonModifiable { operation: "store" });
        }

        let entry = codec::encode(credential).map_err(write_error)?;
        let credential_type = credential.credential_type();
        let algorithm = credential.algorithm();
        let parameters = credential.parameters();
        let ks_alias = alias::encode(credential_alias, credential_type, algorithm, parameters);

        let password = resolve_password(protection.or(inner.protection.as_ref()))?;
        let keystore = inner
            .keystore
            .as_mut()
            .ok_or(CredentialStoreError::NotInitialized)?;
        keystore
            .set_entry(&ks_alias, entry, password_bytes(&password))
            .map_err(|e| CredentialStoreError::CannotWrite(e.to_string()))?;

        let displaced = inner.index.insert(
            credential_alias.to_lowercase(),
            credential_type,
            algorithm.map(str::to_string),
            parameters.map(|p| ParamKey::new(p.clone())),
            ks_alias.clone(),
        );
        // unlikely but possible
        if let Some(old_alias) = displaced {
            if old_alias != ks_alias {
                keystore
                    .delete_entry(&old_alias)
                    .map_err(|e| CredentialStoreError::CannotWrite(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Retrieves a credential matching a possibly partial identity.
    ///
    /// A `None` algorithm or parameter set matches any indexed entry at
    /// that level; the type query may match loosely. A miss is `Ok(None)`,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::CannotRead`] when the underlying
    /// fetch or decode fails and
    /// [`CredentialStoreError::InvalidEntryType`] when the entry kind
    /// contradicts the indexed credential type.
    pub fn retrieve(
        &self,
        credential_alias: &str,
        credential_type: CredentialTypeQuery,
        algorithm: Option<&str>,
        parameters: Option<&AlgorithmParameters>,
        protection: Option<&ProtectionParameter>,
    ) -> Result<Option<Credential>> {
        let inner = self.read_inner();
        if !inner.initialized {
            return Err(CredentialStoreError::NotInitialized);
        }

        let param_key = parameters.map(|p| ParamKey::new(p.clone()));
        let Some(found) = inner.index.lookup(
            &credential_alias.to_lowercase(),
            credential_type,
            algorithm,
            param_key.as_ref(),
        ) else {
            return Ok(None);
        };

        let password = resolve_password(protection.or(inner.protection.as_ref()))?;
        let keystore = inner
            .keystore
            .as_ref()
            .ok_or(CredentialStoreError::NotInitialized)?;
        let Some(entry) = keystore
            .get_entry(found.ks_alias, password_bytes(&password))
            .map_err(|e| CredentialStoreError::CannotRead(e.to_string()))?
        else {
            // the index pointed at an entry the container no longer has
            return Ok(None);
        };

        codec::decode(&entry, found.credential_type, found.algorithm)
            .map(Some)
            .map_err(read_error)
    }

    /// Removes every credential matching a possibly partial identity,
    /// deleting each underlying entry.
    ///
    /// Removing an identity with no matches is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::NonModifiable`] on a read-only
    /// store and [`CredentialStoreError::CannotRemove`] when an underlying
    /// deletion fails.
    pub fn remove(
        &self,
        credential_alias: &str,
        credential_type: CredentialTypeQuery,
        algorithm: Option<&str>,
        parameters: Option<&AlgorithmParameters>,
    ) -> Result<()> {
        let mut inner = self.write_inner();
        let inner = &mut *inner;
        if !inner.initialized {
            return Err(CredentialStoreError::NotInitialized);
        }
        if !inner.modifiable {
            return Err(CredentialStoreError::NonModifiable {
                operation: "remove",
            });
        }

        let param_key = parameters.map(|p| ParamKey::new(p.clone()));
        let removed = inner.index.remove_matching(
            &credential_alias.to_lowercase(),
            credential_type,
            algorithm,
            param_key.as_ref(),
        );

        let keystore = inner
            .keystore
            .as_mut()
            .ok_or(CredentialStoreError::NotInitialized)?;
        for ks_alias in removed {
            keystore
                .delete_entry(&ks_alias)
                .map_err(CredentialStoreError::CannotRemove)?;
        }
        Ok(())
    }

    /// Persists the container to its configured location.
    ///
    /// Without a location this is a no-op. The container is serialized to
    /// a sibling temporary file and atomically renamed over the location,
    /// so a failed flush leaves the previous file untouched; if cleaning
    /// up the temporary fails too, that error is chained onto the primary.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::CannotFlush`] on any I/O or
    /// serialization failure.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.write_inner();
        let inner = &mut *inner;
        if !inner.initialized {
            return Err(CredentialStoreError::NotInitialized);
        }
        let Some(location) = inner.location.clone() else {
            return Ok(());
        };

        let password = resolve_password(inner.protection.as_ref())?;
        let keystore = inner
            .keystore
            .as_mut()
            .ok_or(CredentialStoreError::NotInitialized)?;
        let bytes = keystore
            .save(password_bytes(&password))
            .map_err(|source| {
                CredentialStoreError::CannotFlush(FlushError {
                    source,
                    suppressed: None,
                })
            })?;

        atomic_replace(&location, &bytes).map_err(CredentialStoreError::CannotFlush)
    }

    /// Returns the user aliases currently present in the store.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::NotInitialized`] before
    /// `initialize`.
    pub fn aliases(&self) -> Result<Vec<String>> {
        let inner = self.read_inner();
        if !inner.initialized {
            return Err(CredentialStoreError::NotInitialized);
        }
        Ok(inner.index.aliases())
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for KeyStoreCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyStoreCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStoreCredentialStore")
            .finish_non_exhaustive()
    }
}

/// Parses a boolean attribute the way the configuration surface defines
/// it: case-insensitive `"true"` is true, anything else is false.
fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn password_bytes(password: &Option<Zeroizing<Vec<u8>>>) -> Option<&[u8]> {
    password.as_deref().map(Vec::as_slice)
}

fn write_error(error: CodecError) -> CredentialStoreError {
    match error {
        CodecError::UnsupportedAlgorithm(_) | CodecError::SpecMismatch(_) => {
            CredentialStoreError::UnsupportedCredential(error.to_string())
        }
        other => CredentialStoreError::CannotWrite(other.to_string()),
    }
}

fn read_error(error: CodecError) -> CredentialStoreError {
    match error {
        CodecError::WrongEntryKind { expected, found } => {
            CredentialStoreError::InvalidEntryType { expected, found }
        }
        CodecError::UnsupportedAlgorithm(_) => {
            CredentialStoreError::UnsupportedCredential(error.to_string())
        }
        other => CredentialStoreError::CannotRead(other.to_string()),
    }
}

/// Writes bytes to a sibling temporary file and renames it over the
/// target. On failure the temporary is unlinked and the target untouched.
fn atomic_replace(location: &Path, bytes: &[u8]) -> std::result::Result<(), FlushError> {
    let mut suffix = [0u8; 8];
    getrandom::getrandom(&mut suffix).expect("getrandom failed");
    let file_name = location.file_name().map_or_else(
        || "container".to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    let temporary = location.with_file_name(format!("{file_name}.{}.tmp", hex::encode(suffix)));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&temporary)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temporary, location)
    })();

    written.map_err(|primary| {
        let suppressed = fs::remove_file(&temporary)
            .err()
            .filter(|e| e.kind() != std::io::ErrorKind::NotFound);
        FlushError {
            source: KeyStoreError::Io(primary),
            suppressed,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{
        BearerTokenCredential, CredentialType, KeyPairCredential, X509Certificate,
        X509CertificateChainPublicCredential,
    };
    use crate::keystore::{KeyStoreEntry, SealedKeyStore};
    use crate::password::{
        algorithm, IteratedSaltedHashPasswordSpec, PasswordCredential, PasswordSpec,
    };
    use der::Encode;
    use uuid::Uuid;

    fn temp_store_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("credstore-test-{}.store", Uuid::new_v4()));
        path
    }

    fn file_attributes(location: &Path) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            attributes::LOCATION.to_string(),
            location.to_string_lossy().into_owned(),
        );
        map.insert(attributes::CREATE.to_string(), "true".to_string());
        map
    }

    fn memory_attributes() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(attributes::CREATE.to_string(), "true".to_string());
        map
    }

    fn memory_store() -> KeyStoreCredentialStore {
        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&memory_attributes(), None, &[])
            .expect("initialize");
        store
    }

    /// A small, well-formed DER element standing in for opaque key or
    /// certificate material.
    fn der_blob(content: &[u8]) -> Vec<u8> {
        let inner = der::asn1::OctetStringRef::new(content)
            .expect("octet string")
            .to_der()
            .expect("encode");
        der::asn1::AnyRef::new(der::Tag::Sequence, &inner)
            .expect("sequence")
            .to_der()
            .expect("encode")
    }

    fn clear_password(password: &str) -> Credential {
        Credential::Password(PasswordCredential::clear(password))
    }

    fn exact(credential_type: CredentialType) -> CredentialTypeQuery {
        CredentialTypeQuery::Exact(credential_type)
    }

    #[test]
    fn test_operations_require_initialize() {
        let store = KeyStoreCredentialStore::new();
        assert!(matches!(
            store.store("a", &clear_password("x"), None),
            Err(CredentialStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.retrieve("a", exact(CredentialType::Password), None, None, None),
            Err(CredentialStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.aliases(),
            Err(CredentialStoreError::NotInitialized)
        ));
        assert!(matches!(
            store.flush(),
            Err(CredentialStoreError::NotInitialized)
        ));
    }

    #[test]
    fn test_create_disabled_without_file() {
        let path = temp_store_path();
        let mut config = file_attributes(&path);
        config.insert(attributes::CREATE.to_string(), "false".to_string());
        let store = KeyStoreCredentialStore::new();
        assert!(matches!(
            store.initialize(&config, None, &[]),
            Err(CredentialStoreError::AutomaticCreationDisabled { .. })
        ));
    }

    #[test]
    fn test_unknown_attributes_are_ignored() {
        let mut config = memory_attributes();
        config.insert("frobnicate".to_string(), "yes".to_string());
        let store = KeyStoreCredentialStore::new();
        store.initialize(&config, None, &[]).expect("initialize");
    }

    #[test]
    fn test_clear_password_round_trip_through_file() {
        let path = temp_store_path();
        let protection = ProtectionParameter::with_clear_password("storepass");

        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), Some(protection.clone()), &[])
            .expect("initialize");
        store
            .store("svc1", &clear_password("hunter2"), None)
            .expect("store");
        store.flush().expect("flush");

        let reopened = KeyStoreCredentialStore::new();
        reopened
            .initialize(&file_attributes(&path), Some(protection), &[])
            .expect("reopen");
        let found = reopened
            .retrieve(
                "svc1",
                exact(CredentialType::Password),
                Some(algorithm::CLEAR),
                None,
                None,
            )
            .expect("retrieve")
            .expect("present");
        assert_eq!(found, clear_password("hunter2"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_wrong_store_password_fails_initialize() {
        let path = temp_store_path();
        let store = KeyStoreCredentialStore::new();
        store
            .initialize(
                &file_attributes(&path),
                Some(ProtectionParameter::with_clear_password("right")),
                &[],
            )
            .expect("initialize");
        store
            .store("svc1", &clear_password("hunter2"), None)
            .expect("store");
        store.flush().expect("flush");

        let reopened = KeyStoreCredentialStore::new();
        assert!(matches!(
            reopened.initialize(
                &file_attributes(&path),
                Some(ProtectionParameter::with_clear_password("wrong")),
                &[],
            ),
            Err(CredentialStoreError::CannotInitialize(
                KeyStoreError::IntegrityCheckFailed
            ))
        ));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_two_algorithms_under_one_alias() {
        let store = memory_store();
        let bcrypt = Credential::Password(PasswordCredential::new(
            algorithm::BCRYPT,
            PasswordSpec::IteratedSaltedHash(IteratedSaltedHashPasswordSpec {
                hash: vec![1; 24],
                salt: vec![2; 16],
                iteration_count: 10,
            }),
        ));
        let sha = Credential::Password(PasswordCredential::new(
            algorithm::CRYPT_SHA_512,
            PasswordSpec::IteratedSaltedHash(IteratedSaltedHashPasswordSpec {
                hash: vec![3; 64],
                salt: vec![4; 16],
                iteration_count: 5000,
            }),
        ));
        store.store("u", &bcrypt, None).expect("store bcrypt");
        store.store("u", &sha, None).expect("store sha");

        let found = store
            .retrieve(
                "u",
                exact(CredentialType::Password),
                Some(algorithm::BCRYPT),
                None,
                None,
            )
            .expect("retrieve")
            .expect("present");
        assert_eq!(found, bcrypt);

        store
            .remove("u", exact(CredentialType::Password), Some(algorithm::BCRYPT), None)
            .expect("remove bcrypt");

        // the sibling algorithm survives the selective removal
        let found = store
            .retrieve(
                "u",
                exact(CredentialType::Password),
                Some(algorithm::CRYPT_SHA_512),
                None,
                None,
            )
            .expect("retrieve")
            .expect("present");
        assert_eq!(found, sha);
        assert_eq!(store.aliases().expect("aliases"), vec!["u".to_string()]);

        assert!(store
            .retrieve(
                "u",
                exact(CredentialType::Password),
                Some(algorithm::BCRYPT),
                None,
                None,
            )
            .expect("retrieve")
            .is_none());
    }

    #[test]
    fn test_key_pair_survives_reopen_byte_for_byte() {
        let path = temp_store_path();
        let key_pair = Credential::KeyPair(KeyPairCredential::new(
            "rsa",
            der_blob(b"public-half"),
            der_blob(b"private-half"),
        ));

        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), None, &[])
            .expect("initialize");
        store.store("pair", &key_pair, None).expect("store");
        store.flush().expect("flush");

        let reopened = KeyStoreCredentialStore::new();
        reopened
            .initialize(&file_attributes(&path), None, &[])
            .expect("reopen");
        let found = reopened
            .retrieve("pair", exact(CredentialType::KeyPair), Some("rsa"), None, None)
            .expect("retrieve")
            .expect("present");
        assert_eq!(found, key_pair);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_certificate_chain_survives_reopen() {
        let path = temp_store_path();
        let chain: Vec<X509Certificate> = [&b"end-entity"[..], b"intermediate", b"root"]
            .iter()
            .map(|content| X509Certificate::new(der_blob(content)))
            .collect();
        let credential = Credential::X509CertificateChainPublic(
            X509CertificateChainPublicCredential::new("rsa", chain.clone()),
        );

        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), None, &[])
            .expect("initialize");
        store.store("chain", &credential, None).expect("store");
        store.flush().expect("flush");

        let reopened = KeyStoreCredentialStore::new();
        reopened
            .initialize(&file_attributes(&path), None, &[])
            .expect("reopen");
        let found = reopened
            .retrieve(
                "chain",
                exact(CredentialType::X509CertificateChainPublic),
                Some("rsa"),
                None,
                None,
            )
            .expect("retrieve")
            .expect("present");
        match found {
            Credential::X509CertificateChainPublic(found) => {
                assert_eq!(found.chain().len(), 3);
                assert_eq!(found.chain(), chain.as_slice());
            }
            other => panic!("unexpected credential {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_unrecognized_underlying_alias_is_tolerated() {
        let path = temp_store_path();
        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), None, &[])
            .expect("initialize");
        store
            .store("svc1", &clear_password("hunter2"), None)
            .expect("store");
        store.flush().expect("flush");

        // plant a foreign entry straight into the backing file
        let mut engine = SealedKeyStore::new();
        let bytes = fs::read(&path).expect("read container");
        KeyStoreEngine::load(&mut engine, Some(&bytes), None).expect("load container");
        engine
            .set_entry(
                "junk_no_slashes",
                KeyStoreEntry::SecretKey {
                    algorithm: "aes".to_string(),
                    key: vec![1, 2, 3],
                },
                None,
            )
            .expect("plant entry");
        let bytes = engine.save(None).expect("save container");
        fs::write(&path, bytes).expect("write container");

        let reopened = KeyStoreCredentialStore::new();
        reopened
            .initialize(&file_attributes(&path), None, &[])
            .expect("reopen");
        assert_eq!(
            reopened.aliases().expect("aliases"),
            vec!["svc1".to_string()]
        );
        assert!(reopened
            .retrieve(
                "svc1",
                exact(CredentialType::Password),
                Some(algorithm::CLEAR),
                None,
                None,
            )
            .expect("retrieve")
            .is_some());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_non_modifiable_store_refuses_mutation() {
        let path = temp_store_path();
        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), None, &[])
            .expect("initialize");
        store
            .store("svc1", &clear_password("hunter2"), None)
            .expect("store");
        store.flush().expect("flush");

        let mut config = file_attributes(&path);
        config.insert(attributes::MODIFIABLE.to_string(), "false".to_string());
        let readonly = KeyStoreCredentialStore::new();
        readonly.initialize(&config, None, &[]).expect("reopen");
        assert!(!readonly.is_modifiable());

        assert!(matches!(
            readonly.store("svc2", &clear_password("nope"), None),
            Err(CredentialStoreError::NonModifiable { operation: "store" })
        ));
        assert!(matches!(
            readonly.remove("svc1", exact(CredentialType::Password), None, None),
            Err(CredentialStoreError::NonModifiable { operation: "remove" })
        ));

        // reads still work
        assert!(readonly
            .retrieve(
                "svc1",
                exact(CredentialType::Password),
                Some(algorithm::CLEAR),
                None,
                None,
            )
            .expect("retrieve")
            .is_some());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_replacing_same_identity_leaves_one_underlying_entry() {
        let path = temp_store_path();
        let store = KeyStoreCredentialStore::new();
        store
            .initialize(&file_attributes(&path), None, &[])
            .expect("initialize");
        store
            .store("svc1", &clear_password("first"), None)
            .expect("store");
        store
            .store("svc1", &clear_password("second"), None)
            .expect("replace");
        store.flush().expect("flush");

        let mut engine = SealedKeyStore::new();
        let bytes = fs::read(&path).expect("read container");
        KeyStoreEngine::load(&mut engine, Some(&bytes), None).expect("load container");
        assert_eq!(engine.len(), 1);

        let found = store
            .retrieve(
                "svc1",
                exact(CredentialType::Password),
                Some(algorithm::CLEAR),
                None,
                None,
            )
            .expect("retrieve")
            .expect("present");
        assert_eq!(found, clear_password("second"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_loose_type_retrieval() {
        let store = memory_store();
        store
            .store("tok", &Credential::BearerToken(BearerTokenCredential::new("abc")), None)
            .expect("store token");
        store
            .store("tok", &clear_password("hunter2"), None)
            .expect("store password");

        // an algorithm-bearing query skips the token
        let found = store
            .retrieve("tok", CredentialTypeQuery::Algorithm, None, None, None)
            .expect("retrieve")
            .expect("present");
        assert_eq!(found.credential_type(), CredentialType::Password);

        // an unconstrained query takes the earliest indexed type
        let found = store
            .retrieve("tok", CredentialTypeQuery::Any, None, None, None)
            .expect("retrieve")
            .expect("present");
        assert_eq!(found.credential_type(), CredentialType::BearerToken);
    }

    #[test]
    fn test_remove_without_algorithm_removes_all_of_type() {
        let store = memory_store();
        let bcrypt = Credential::Password(PasswordCredential::new(
            algorithm::BCRYPT,
            PasswordSpec::IteratedSaltedHash(IteratedSaltedHashPasswordSpec {
                hash: vec![1; 24],
                salt: vec![2; 16],
                iteration_count: 10,
            }),
        ));
        store.store("u", &bcrypt, None).expect("store bcrypt");
        store
            .store("u", &clear_password("hunter2"), None)
            .expect("store clear");
        store
            .store(
                "u",
                &Credential::BearerToken(BearerTokenCredential::new("abc")),
                None,
            )
            .expect("store token");

        store
            .remove("u", exact(CredentialType::Password), None, None)
            .expect("remove passwords");

        assert!(store
            .retrieve("u", exact(CredentialType::Password), None, None, None)
            .expect("retrieve")
            .is_none());
        // the bearer token under the same alias is untouched
        assert!(store
            .retrieve("u", exact(CredentialType::BearerToken), None, None, None)
            .expect("retrieve")
            .is_some());
    }

    #[test]
    fn test_aliases_are_lower_cased() {
        let store = memory_store();
        store
            .store("MixedCase", &clear_password("x"), None)
            .expect("store");
        assert_eq!(
            store.aliases().expect("aliases"),
            vec!["mixedcase".to_string()]
        );
        assert!(store
            .retrieve(
                "mixedCASE",
                exact(CredentialType::Password),
                Some(algorithm::CLEAR),
                None,
                None,
            )
            .expect("retrieve")
            .is_some());
    }

    #[test]
    fn test_flush_without_location_is_a_no_op() {
        let store = memory_store();
        store.store("a", &clear_password("x"), None).expect("store");
        store.flush().expect("flush");
    }

    #[test]
    fn test_unsupported_password_algorithm_is_rejected() {
        let store = memory_store();
        let credential = Credential::Password(PasswordCredential::new(
            "argon2id",
            PasswordSpec::Clear(crate::password::ClearPasswordSpec {
                password: "x".into(),
            }),
        ));
        assert!(matches!(
            store.store("a", &credential, None),
            Err(CredentialStoreError::UnsupportedCredential(_))
        ));
    }

    #[test]
    fn test_atomic_replace_failure_leaves_no_target() {
        let mut missing_dir = std::env::temp_dir();
        missing_dir.push(format!("credstore-missing-{}", Uuid::new_v4()));
        let target = missing_dir.join("container");
        assert!(atomic_replace(&target, b"data").is_err());
        assert!(!target.exists());
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        use std::sync::Arc as StdArc;

        let store = StdArc::new(memory_store());
        let mut handles = Vec::new();
        for worker in 0..4 {
            let store = StdArc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    let alias = format!("alias-{worker}");
                    store
                        .store(&alias, &clear_password(&format!("pw-{i}")), None)
                        .expect("store");
                    let found = store
                        .retrieve(
                            &alias,
                            exact(CredentialType::Password),
                            Some(algorithm::CLEAR),
                            None,
                            None,
                        )
                        .expect("retrieve");
                    assert!(found.is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker");
        }
        assert_eq!(store.aliases().expect("aliases").len(), 4);
    }
}
