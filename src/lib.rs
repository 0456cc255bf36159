//! A multi-credential store backed by a conventional key store.
//!
//! Conventional key stores hold secret-key, private-key-with-chain and
//! trusted-certificate entries under a single textual alias. This crate
//! overlays a richer model on such a container: a logical credential is
//! identified by `(alias, credential type, algorithm, parameters)`, and
//! several credentials can coexist under one user-supplied alias.
//!
//! # Architecture
//!
//! The store is built from three cooperating pieces:
//!
//! 1. **Alias codec** — packs the identity quadruple into one underlying
//!    alias and parses it back when the container is reopened.
//!
//! 2. **Credential codecs** — deterministic DER encodings that transport
//!    each credential variant through a container that only accepts opaque
//!    blobs or private-key entries.
//!
//! 3. **Store facade** — a reader-writer disciplined front over the
//!    in-memory index and the container, with atomic on-disk replacement
//!    and a tolerant boot scan that skips entries written by anything
//!    other than this store.
//!
//! # Container engines
//!
//! The container itself is reached through the
//! [`KeyStoreEngine`](keystore::KeyStoreEngine) trait. A sealed engine
//! ships in the box: `bincode`-serialized entries, optionally sealed with
//! XChaCha20-Poly1305 under a password-derived key. Alternative engines
//! plug in through [`KeyStoreProvider`](keystore::KeyStoreProvider)s
//! passed to `initialize`.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod alias;
mod codec;
mod index;

pub mod credential;
pub mod error;
pub mod keystore;
pub mod params;
pub mod password;
pub mod protection;
pub mod store;

pub use credential::{Credential, CredentialType, CredentialTypeQuery};
pub use error::{CredentialStoreError, Result};
pub use params::AlgorithmParameters;
pub use password::PasswordCredential;
pub use protection::ProtectionParameter;
pub use store::KeyStoreCredentialStore;
