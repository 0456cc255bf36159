//! Protection parameters and their translation to container passwords.
//!
//! The store and its entries are guarded by caller-supplied protection
//! material. The only accepted shape is a credential source that yields a
//! clear password credential; the adapter below translates that into the
//! raw password bytes the underlying container understands. `None` is
//! always permitted and means "no password" at the store level, or "use
//! the store's own protection" per operation.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::credential::Credential;
use crate::error::{CredentialStoreError, Result};
use crate::password::{PasswordCredential, PasswordSpec};

/// A source of a protection credential.
///
/// Sources may defer to a prompt, an external secret service or a fixed
/// value; the store only asks for the credential when it needs to open or
/// persist the container.
pub trait CredentialSource: Send + Sync {
    /// Produces the protection credential, or `None` when the source has
    /// nothing to offer.
    ///
    /// # Errors
    ///
    /// Returns an error if acquiring the credential fails.
    fn credential(&self) -> Result<Option<Credential>>;
}

/// Protection material guarding the backing container or a single entry.
#[derive(Clone)]
pub enum ProtectionParameter {
    /// A credential source expected to yield a clear password.
    CredentialSource(Arc<dyn CredentialSource>),
}

impl ProtectionParameter {
    /// Builds a protection parameter around a fixed clear password, the
    /// common case for configuration-supplied store passwords.
    #[must_use]
    pub fn with_clear_password(password: &str) -> Self {
        Self::CredentialSource(Arc::new(FixedCredentialSource {
            credential: Credential::Password(PasswordCredential::clear(password)),
        }))
    }
}

impl fmt::Debug for ProtectionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialSource(_) => f.write_str("ProtectionParameter::CredentialSource(..)"),
        }
    }
}

/// A credential source that always yields the same credential.
struct FixedCredentialSource {
    credential: Credential,
}

impl CredentialSource for FixedCredentialSource {
    fn credential(&self) -> Result<Option<Credential>> {
        Ok(Some(self.credential.clone()))
    }
}

/// Translates a protection parameter into the container's password form.
///
/// # Errors
///
/// Returns [`CredentialStoreError::InvalidProtectionParameter`] when the
/// source yields anything other than a clear password credential.
pub(crate) fn resolve_password(
    protection: Option<&ProtectionParameter>,
) -> Result<Option<Zeroizing<Vec<u8>>>> {
    let Some(ProtectionParameter::CredentialSource(source)) = protection else {
        return Ok(None);
    };
    match source.credential()? {
        None => Ok(None),
        Some(Credential::Password(password)) => match password.spec() {
            PasswordSpec::Clear(spec) => {
                Ok(Some(Zeroizing::new(spec.password.as_bytes().to_vec())))
            }
            _ => Err(CredentialStoreError::InvalidProtectionParameter),
        },
        Some(_) => Err(CredentialStoreError::InvalidProtectionParameter),
    }
}
