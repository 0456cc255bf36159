//! Password credentials and the closed password algorithm set.
//!
//! A password credential pairs an algorithm name with a spec record holding
//! the already-derived data for that algorithm. The store does not hash or
//! verify passwords; spec records are plain data transported through the
//! codec. Which spec shape an algorithm requires is decided by a finite
//! match table over the algorithm set, with the masked family recognized by
//! prefix.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::params::AlgorithmParameters;

/// Canonical names of the supported password algorithms.
pub mod algorithm {
    /// Modular-crypt bcrypt.
    pub const BCRYPT: &str = "bcrypt";
    /// BSD variant of DES crypt.
    pub const BSD_CRYPT_DES: &str = "bsd-crypt-des";
    /// SCRAM with SHA-1.
    pub const SCRAM_SHA_1: &str = "scram-sha-1";
    /// SCRAM with SHA-256.
    pub const SCRAM_SHA_256: &str = "scram-sha-256";
    /// SCRAM with SHA-384.
    pub const SCRAM_SHA_384: &str = "scram-sha-384";
    /// SCRAM with SHA-512.
    pub const SCRAM_SHA_512: &str = "scram-sha-512";
    /// Sun MD5 crypt.
    pub const SUN_CRYPT_MD5: &str = "sun-crypt-md5";
    /// Sun MD5 crypt with bare salt.
    pub const SUN_CRYPT_MD5_BARE_SALT: &str = "sun-crypt-md5-bare-salt";
    /// SHA-256 crypt.
    pub const CRYPT_SHA_256: &str = "crypt-sha-256";
    /// SHA-512 crypt.
    pub const CRYPT_SHA_512: &str = "crypt-sha-512";

    /// Clear text.
    pub const CLEAR: &str = "clear";

    /// HTTP digest with MD5.
    pub const DIGEST_MD5: &str = "digest-md5";
    /// HTTP digest with SHA-1.
    pub const DIGEST_SHA: &str = "digest-sha";
    /// HTTP digest with SHA-256.
    pub const DIGEST_SHA_256: &str = "digest-sha-256";
    /// HTTP digest with SHA-384.
    pub const DIGEST_SHA_384: &str = "digest-sha-384";
    /// HTTP digest with SHA-512.
    pub const DIGEST_SHA_512: &str = "digest-sha-512";

    /// One-time password with MD5.
    pub const OTP_MD5: &str = "otp-md5";
    /// One-time password with SHA-1.
    pub const OTP_SHA1: &str = "otp-sha1";

    /// Salted digest, password before salt, MD5.
    pub const PASSWORD_SALT_DIGEST_MD5: &str = "password-salt-digest-md5";
    /// Salted digest, password before salt, SHA-1.
    pub const PASSWORD_SALT_DIGEST_SHA_1: &str = "password-salt-digest-sha-1";
    /// Salted digest, password before salt, SHA-256.
    pub const PASSWORD_SALT_DIGEST_SHA_256: &str = "password-salt-digest-sha-256";
    /// Salted digest, password before salt, SHA-384.
    pub const PASSWORD_SALT_DIGEST_SHA_384: &str = "password-salt-digest-sha-384";
    /// Salted digest, password before salt, SHA-512.
    pub const PASSWORD_SALT_DIGEST_SHA_512: &str = "password-salt-digest-sha-512";
    /// Salted digest, salt before password, MD5.
    pub const SALT_PASSWORD_DIGEST_MD5: &str = "salt-password-digest-md5";
    /// Salted digest, salt before password, SHA-1.
    pub const SALT_PASSWORD_DIGEST_SHA_1: &str = "salt-password-digest-sha-1";
    /// Salted digest, salt before password, SHA-256.
    pub const SALT_PASSWORD_DIGEST_SHA_256: &str = "salt-password-digest-sha-256";
    /// Salted digest, salt before password, SHA-384.
    pub const SALT_PASSWORD_DIGEST_SHA_384: &str = "salt-password-digest-sha-384";
    /// Salted digest, salt before password, SHA-512.
    pub const SALT_PASSWORD_DIGEST_SHA_512: &str = "salt-password-digest-sha-512";
    /// Traditional Unix DES crypt.
    pub const CRYPT_DES: &str = "crypt-des";
    /// Unix MD5 crypt.
    pub const CRYPT_MD5: &str = "crypt-md5";

    /// Unsalted digest, MD2.
    pub const SIMPLE_DIGEST_MD2: &str = "simple-digest-md2";
    /// Unsalted digest, MD5.
    pub const SIMPLE_DIGEST_MD5: &str = "simple-digest-md5";
    /// Unsalted digest, SHA-1.
    pub const SIMPLE_DIGEST_SHA_1: &str = "simple-digest-sha-1";
    /// Unsalted digest, SHA-256.
    pub const SIMPLE_DIGEST_SHA_256: &str = "simple-digest-sha-256";
    /// Unsalted digest, SHA-384.
    pub const SIMPLE_DIGEST_SHA_384: &str = "simple-digest-sha-384";
    /// Unsalted digest, SHA-512.
    pub const SIMPLE_DIGEST_SHA_512: &str = "simple-digest-sha-512";

    /// Prefix shared by every masked password algorithm.
    pub const MASKED_PREFIX: &str = "masked-";
}

// Spec records

/// A clear text password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ClearPasswordSpec {
    /// The password itself.
    pub password: String,
}

impl fmt::Debug for ClearPasswordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClearPasswordSpec")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A pre-digested `username:realm:password` credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPasswordSpec {
    /// The digested user name.
    pub username: String,
    /// The digest realm.
    pub realm: String,
    /// The digest bytes.
    pub digest: Vec<u8>,
}

/// An unsalted digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPasswordSpec {
    /// The digest bytes.
    pub digest: Vec<u8>,
}

/// A salted digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedHashPasswordSpec {
    /// The digest bytes.
    pub hash: Vec<u8>,
    /// The salt bytes.
    pub salt: Vec<u8>,
}

/// A salted, iterated digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratedSaltedHashPasswordSpec {
    /// The digest bytes.
    pub hash: Vec<u8>,
    /// The salt bytes.
    pub salt: Vec<u8>,
    /// The iteration count.
    pub iteration_count: u32,
}

/// A one-time password state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimePasswordSpec {
    /// The current hash.
    pub hash: Vec<u8>,
    /// The seed.
    pub seed: Vec<u8>,
    /// The sequence number.
    pub sequence_number: u32,
}

/// A masked password.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MaskedPasswordSpec {
    /// The initial key material the mask key is derived from.
    pub initial_key_material: String,
    /// The iteration count of the masking derivation.
    pub iteration_count: u32,
    /// The masking salt.
    pub salt: Vec<u8>,
    /// The masked password bytes.
    pub masked_password_bytes: Vec<u8>,
}

impl fmt::Debug for MaskedPasswordSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskedPasswordSpec")
            .field("initial_key_material", &"[REDACTED]")
            .field("iteration_count", &self.iteration_count)
            .field("salt", &hex::encode(&self.salt))
            .field("masked_password_bytes", &hex::encode(&self.masked_password_bytes))
            .finish()
    }
}

/// The spec record of a password credential; the variant must agree with
/// the algorithm's [`PasswordFamily`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSpec {
    /// Clear text.
    Clear(ClearPasswordSpec),
    /// Digested `username:realm:password`.
    Digest(DigestPasswordSpec),
    /// Unsalted digest.
    SimpleHash(HashPasswordSpec),
    /// Salted digest.
    SaltedHash(SaltedHashPasswordSpec),
    /// Salted, iterated digest.
    IteratedSaltedHash(IteratedSaltedHashPasswordSpec),
    /// One-time password state.
    OneTime(OneTimePasswordSpec),
    /// Masked password.
    Masked(MaskedPasswordSpec),
}

// Family table

/// The spec families password algorithms fan out into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFamily {
    /// `clear`.
    Clear,
    /// `digest-*`.
    Digest,
    /// `simple-digest-*`.
    SimpleHash,
    /// Salted simple digests and the unsalted-iteration Unix crypts.
    SaltedHash,
    /// Iterated and salted algorithms.
    IteratedSaltedHash,
    /// `otp-*`.
    OneTime,
    /// `masked-*`.
    Masked,
}

impl PasswordFamily {
    /// Resolves an algorithm name to its family, or `None` when the
    /// algorithm is outside the closed set.
    #[must_use]
    pub fn of(algorithm: &str) -> Option<Self> {
        use self::algorithm as a;
        let family = match algorithm {
            a::BCRYPT
            | a::BSD_CRYPT_DES
            | a::SCRAM_SHA_1
            | a::SCRAM_SHA_256
            | a::SCRAM_SHA_384
            | a::SCRAM_SHA_512
            | a::SUN_CRYPT_MD5
            | a::SUN_CRYPT_MD5_BARE_SALT
            | a::CRYPT_SHA_256
            | a::CRYPT_SHA_512 => Self::IteratedSaltedHash,
            a::CLEAR => Self::Clear,
            a::DIGEST_MD5 | a::DIGEST_SHA | a::DIGEST_SHA_256 | a::DIGEST_SHA_384
            | a::DIGEST_SHA_512 => Self::Digest,
            a::OTP_MD5 | a::OTP_SHA1 => Self::OneTime,
            a::PASSWORD_SALT_DIGEST_MD5
            | a::PASSWORD_SALT_DIGEST_SHA_1
            | a::PASSWORD_SALT_DIGEST_SHA_256
            | a::PASSWORD_SALT_DIGEST_SHA_384
            | a::PASSWORD_SALT_DIGEST_SHA_512
            | a::SALT_PASSWORD_DIGEST_MD5
            | a::SALT_PASSWORD_DIGEST_SHA_1
            | a::SALT_PASSWORD_DIGEST_SHA_256
            | a::SALT_PASSWORD_DIGEST_SHA_384
            | a::SALT_PASSWORD_DIGEST_SHA_512
            | a::CRYPT_DES
            | a::CRYPT_MD5 => Self::SaltedHash,
            a::SIMPLE_DIGEST_MD2
            | a::SIMPLE_DIGEST_MD5
            | a::SIMPLE_DIGEST_SHA_1
            | a::SIMPLE_DIGEST_SHA_256
            | a::SIMPLE_DIGEST_SHA_384
            | a::SIMPLE_DIGEST_SHA_512 => Self::SimpleHash,
            masked if masked.starts_with(a::MASKED_PREFIX) => Self::Masked,
            _ => return None,
        };
        Some(family)
    }

    /// Tests whether a spec record has the shape this family requires.
    #[must_use]
    pub const fn matches(self, spec: &PasswordSpec) -> bool {
        matches!(
            (self, spec),
            (Self::Clear, PasswordSpec::Clear(_))
                | (Self::Digest, PasswordSpec::Digest(_))
                | (Self::SimpleHash, PasswordSpec::SimpleHash(_))
                | (Self::SaltedHash, PasswordSpec::SaltedHash(_))
                | (Self::IteratedSaltedHash, PasswordSpec::IteratedSaltedHash(_))
                | (Self::OneTime, PasswordSpec::OneTime(_))
                | (Self::Masked, PasswordSpec::Masked(_))
        )
    }
}

// Password credential

/// A password credential: an algorithm name, the matching spec record, and
/// optional algorithm parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    algorithm: String,
    spec: PasswordSpec,
    parameters: Option<AlgorithmParameters>,
}

impl PasswordCredential {
    /// Creates a password credential.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, spec: PasswordSpec) -> Self {
        Self {
            algorithm: algorithm.into(),
            spec,
            parameters: None,
        }
    }

    /// Creates a clear password credential, the most common shape.
    #[must_use]
    pub fn clear(password: impl Into<String>) -> Self {
        Self::new(
            algorithm::CLEAR,
            PasswordSpec::Clear(ClearPasswordSpec {
                password: password.into(),
            }),
        )
    }

    /// Attaches algorithm parameters to this credential.
    #[must_use]
    pub fn with_parameters(mut self, parameters: AlgorithmParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Returns the password algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the spec record.
    #[must_use]
    pub const fn spec(&self) -> &PasswordSpec {
        &self.spec
    }

    /// Returns the algorithm parameters, if any.
    #[must_use]
    pub const fn parameters(&self) -> Option<&AlgorithmParameters> {
        self.parameters.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_table_covers_closed_set() {
        assert_eq!(
            PasswordFamily::of(algorithm::BCRYPT),
            Some(PasswordFamily::IteratedSaltedHash)
        );
        assert_eq!(PasswordFamily::of(algorithm::CLEAR), Some(PasswordFamily::Clear));
        assert_eq!(
            PasswordFamily::of(algorithm::DIGEST_SHA_256),
            Some(PasswordFamily::Digest)
        );
        assert_eq!(
            PasswordFamily::of(algorithm::OTP_SHA1),
            Some(PasswordFamily::OneTime)
        );
        assert_eq!(
            PasswordFamily::of(algorithm::CRYPT_DES),
            Some(PasswordFamily::SaltedHash)
        );
        assert_eq!(
            PasswordFamily::of(algorithm::SALT_PASSWORD_DIGEST_SHA_512),
            Some(PasswordFamily::SaltedHash)
        );
        assert_eq!(
            PasswordFamily::of(algorithm::SIMPLE_DIGEST_MD2),
            Some(PasswordFamily::SimpleHash)
        );
        assert_eq!(
            PasswordFamily::of("masked-md5-des"),
            Some(PasswordFamily::Masked)
        );
        assert_eq!(PasswordFamily::of("argon2id"), None);
    }

    #[test]
    fn test_family_spec_agreement() {
        let clear = PasswordSpec::Clear(ClearPasswordSpec {
            password: "hunter2".into(),
        });
        assert!(PasswordFamily::Clear.matches(&clear));
        assert!(!PasswordFamily::Digest.matches(&clear));

        let iterated = PasswordSpec::IteratedSaltedHash(IteratedSaltedHashPasswordSpec {
            hash: vec![1],
            salt: vec![2],
            iteration_count: 10,
        });
        assert!(PasswordFamily::IteratedSaltedHash.matches(&iterated));
        assert!(!PasswordFamily::SaltedHash.matches(&iterated));
    }

    #[test]
    fn test_clear_spec_debug_redacts_password() {
        let credential = PasswordCredential::clear("hunter2");
        assert!(!format!("{credential:?}").contains("hunter2"));
    }
}
