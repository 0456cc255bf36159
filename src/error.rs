//! Error types for credential store operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::keystore::KeyStoreError;

/// Result type for credential store operations.
pub type Result<T> = std::result::Result<T, CredentialStoreError>;

/// Errors raised by the credential store facade.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// An operation was attempted before `initialize`.
    #[error("credential store has not been initialized")]
    NotInitialized,

    /// No backing file was found and automatic creation is disabled.
    #[error("automatic creation of storage at {location:?} is disabled")]
    AutomaticCreationDisabled {
        /// The configured storage location, when one was given.
        location: Option<PathBuf>,
    },

    /// The backing container could not be read or failed its integrity check.
    #[error("cannot initialize credential store: {0}")]
    CannotInitialize(#[source] KeyStoreError),

    /// Encoding or underlying placement of a credential failed.
    #[error("cannot write credential to store: {0}")]
    CannotWrite(String),

    /// Decoding or underlying retrieval of a credential failed.
    #[error("cannot acquire credential from store: {0}")]
    CannotRead(String),

    /// Deleting an underlying entry failed.
    #[error("cannot remove credential from store: {0}")]
    CannotRemove(#[source] KeyStoreError),

    /// Persisting the store to its location failed.
    #[error("cannot flush credential store: {0}")]
    CannotFlush(FlushError),

    /// The credential variant or password algorithm is outside the closed set.
    #[error("unsupported credential: {0}")]
    UnsupportedCredential(String),

    /// An underlying entry exists but its kind contradicts the indexed type.
    #[error("invalid credential store entry type: expected a {expected} entry, found a {found} entry")]
    InvalidEntryType {
        /// The entry kind the indexed credential type requires.
        expected: &'static str,
        /// The entry kind actually present in the container.
        found: &'static str,
    },

    /// The protection parameter is not of an accepted shape.
    #[error("invalid protection parameter: only a credential source yielding a clear password is accepted")]
    InvalidProtectionParameter,

    /// A mutating operation was attempted on a read-only store.
    #[error("credential store is not modifiable: cannot {operation}")]
    NonModifiable {
        /// The operation that was refused.
        operation: &'static str,
    },
}

/// Failure while persisting the container, with an optional suppressed
/// cleanup failure.
///
/// When writing the temporary file fails and unlinking it fails too, the
/// cleanup error is chained here rather than masking the primary failure.
#[derive(Debug)]
pub struct FlushError {
    /// The primary failure.
    pub source: KeyStoreError,
    /// A secondary failure raised while cleaning up the temporary file.
    pub suppressed: Option<std::io::Error>,
}

impl fmt::Display for FlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(suppressed) = &self.suppressed {
            write!(f, " (cleanup of the temporary file also failed: {suppressed})")?;
        }
        Ok(())
    }
}

impl std::error::Error for FlushError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
