//! Credential variants and their identity model.
//!
//! A logical credential is identified by the quadruple of user alias,
//! credential type, optional algorithm name and optional algorithm
//! parameters. This module defines the closed set of credential variants
//! the store understands, the [`CredentialType`] tags used by the alias
//! encoding, and the [`CredentialTypeQuery`] used for loose type matching
//! on lookup.
//!
//! Keys and certificates are carried as DER-encoded value records; parsing
//! them into live cryptographic objects is the business of external
//! primitive libraries, not of the store.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::params::AlgorithmParameters;
use crate::password::PasswordCredential;

// Credential types

/// The closed set of concrete credential variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialType {
    /// Raw symmetric key material plus its algorithm name.
    SecretKey,
    /// An asymmetric public key.
    PublicKey,
    /// A public and private key of the same algorithm.
    KeyPair,
    /// An ordered, non-empty X.509 certificate chain.
    X509CertificateChainPublic,
    /// A private key plus its ordered X.509 certificate chain.
    X509CertificateChainPrivate,
    /// An opaque textual token.
    BearerToken,
    /// A password under one of the closed set of password algorithms.
    Password,
}

impl CredentialType {
    /// All concrete credential types, in canonical order.
    pub const ALL: [Self; 7] = [
        Self::SecretKey,
        Self::PublicKey,
        Self::KeyPair,
        Self::X509CertificateChainPublic,
        Self::X509CertificateChainPrivate,
        Self::BearerToken,
        Self::Password,
    ];

    /// Returns the canonical lower-case token used in underlying aliases.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::SecretKey => "secretkeycredential",
            Self::PublicKey => "publickeycredential",
            Self::KeyPair => "keypaircredential",
            Self::X509CertificateChainPublic => "x509certificatechainpubliccredential",
            Self::X509CertificateChainPrivate => "x509certificatechainprivatecredential",
            Self::BearerToken => "bearertokencredential",
            Self::Password => "passwordcredential",
        }
    }

    /// Resolves a canonical token back to its credential type.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.token() == token)
    }

    /// Returns `true` for variants that carry an algorithm name.
    #[must_use]
    pub const fn is_algorithm_bearing(self) -> bool {
        !matches!(self, Self::BearerToken)
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A type pattern for lookup and removal.
///
/// The index is keyed by concrete [`CredentialType`]s; a query may name one
/// exactly or match loosely through one of the abstract supertypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTypeQuery {
    /// Match exactly one concrete credential type.
    Exact(CredentialType),
    /// Match any algorithm-bearing credential type.
    Algorithm,
    /// Match any credential type.
    Any,
}

impl CredentialTypeQuery {
    /// Tests whether a concrete credential type satisfies this query.
    #[must_use]
    pub const fn accepts(self, credential_type: CredentialType) -> bool {
        match self {
            Self::Exact(exact) => exact as u8 == credential_type as u8,
            Self::Algorithm => credential_type.is_algorithm_bearing(),
            Self::Any => true,
        }
    }

    /// Returns the concrete type when this query names one exactly.
    #[must_use]
    pub const fn exact(self) -> Option<CredentialType> {
        match self {
            Self::Exact(exact) => Some(exact),
            Self::Algorithm | Self::Any => None,
        }
    }
}

impl From<CredentialType> for CredentialTypeQuery {
    fn from(credential_type: CredentialType) -> Self {
        Self::Exact(credential_type)
    }
}

// Value records

/// A DER-encoded X.509 certificate.
///
/// The store treats certificates as opaque DER elements; it never inspects
/// their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Certificate {
    der: Vec<u8>,
}

impl X509Certificate {
    /// Wraps the DER encoding of a certificate.
    #[must_use]
    pub const fn new(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// Returns the certificate's DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Raw symmetric key material plus its algorithm name.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyCredential {
    algorithm: String,
    key: Vec<u8>,
}

impl SecretKeyCredential {
    /// Creates a secret key credential from an algorithm name and raw key
    /// bytes.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            key,
        }
    }

    /// Returns the key algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for SecretKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyCredential")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// An asymmetric public key, carried as its X.509 `SubjectPublicKeyInfo`
/// encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredential {
    algorithm: String,
    spki: Vec<u8>,
}

impl PublicKeyCredential {
    /// Creates a public key credential from an algorithm name and SPKI DER.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, spki: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            spki,
        }
    }

    /// Returns the key algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the `SubjectPublicKeyInfo` DER bytes.
    #[must_use]
    pub fn spki(&self) -> &[u8] {
        &self.spki
    }
}

/// A public and private key of the same algorithm.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyPairCredential {
    algorithm: String,
    public_spki: Vec<u8>,
    private_pkcs8: Vec<u8>,
}

impl KeyPairCredential {
    /// Creates a key pair credential from an algorithm name, the public
    /// key's SPKI DER and the private key's PKCS#8 DER.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, public_spki: Vec<u8>, private_pkcs8: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            public_spki,
            private_pkcs8,
        }
    }

    /// Returns the key algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the public key's `SubjectPublicKeyInfo` DER bytes.
    #[must_use]
    pub fn public_spki(&self) -> &[u8] {
        &self.public_spki
    }

    /// Returns the private key's PKCS#8 DER bytes.
    #[must_use]
    pub fn private_pkcs8(&self) -> &[u8] {
        &self.private_pkcs8
    }
}

impl fmt::Debug for KeyPairCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairCredential")
            .field("algorithm", &self.algorithm)
            .field("public_spki", &hex::encode(&self.public_spki))
            .field("private_pkcs8", &"[REDACTED]")
            .finish()
    }
}

/// An ordered, non-empty X.509 certificate chain.
///
/// The end-entity certificate comes first. The key algorithm of the
/// end-entity certificate is carried explicitly since the store does not
/// parse certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509CertificateChainPublicCredential {
    algorithm: String,
    chain: Vec<X509Certificate>,
}

impl X509CertificateChainPublicCredential {
    /// Creates a public chain credential. The chain must be non-empty; an
    /// empty chain is rejected when the credential is stored.
    #[must_use]
    pub fn new(algorithm: impl Into<String>, chain: Vec<X509Certificate>) -> Self {
        Self {
            algorithm: algorithm.into(),
            chain,
        }
    }

    /// Returns the key algorithm of the end-entity certificate.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the certificate chain, end-entity first.
    #[must_use]
    pub fn chain(&self) -> &[X509Certificate] {
        &self.chain
    }
}

/// A private key plus its ordered X.509 certificate chain.
#[derive(Clone, PartialEq, Eq)]
pub struct X509CertificateChainPrivateCredential {
    algorithm: String,
    private_pkcs8: Vec<u8>,
    chain: Vec<X509Certificate>,
}

impl X509CertificateChainPrivateCredential {
    /// Creates a private chain credential from an algorithm name, the
    /// private key's PKCS#8 DER and the certificate chain.
    #[must_use]
    pub fn new(
        algorithm: impl Into<String>,
        private_pkcs8: Vec<u8>,
        chain: Vec<X509Certificate>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            private_pkcs8,
            chain,
        }
    }

    /// Returns the key algorithm name.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the private key's PKCS#8 DER bytes.
    #[must_use]
    pub fn private_pkcs8(&self) -> &[u8] {
        &self.private_pkcs8
    }

    /// Returns the certificate chain, end-entity first.
    #[must_use]
    pub fn chain(&self) -> &[X509Certificate] {
        &self.chain
    }
}

impl Drop for X509CertificateChainPrivateCredential {
    fn drop(&mut self) {
        self.private_pkcs8.zeroize();
    }
}

impl fmt::Debug for X509CertificateChainPrivateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509CertificateChainPrivateCredential")
            .field("algorithm", &self.algorithm)
            .field("private_pkcs8", &"[REDACTED]")
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

/// An opaque textual token.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BearerTokenCredential {
    token: String,
}

impl BearerTokenCredential {
    /// Creates a bearer token credential.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the token string.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for BearerTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// Credential sum

/// A credential of one of the seven supported variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Raw symmetric key material.
    SecretKey(SecretKeyCredential),
    /// An asymmetric public key.
    PublicKey(PublicKeyCredential),
    /// A public and private key pair.
    KeyPair(KeyPairCredential),
    /// A public X.509 certificate chain.
    X509CertificateChainPublic(X509CertificateChainPublicCredential),
    /// A private key with its X.509 certificate chain.
    X509CertificateChainPrivate(X509CertificateChainPrivateCredential),
    /// An opaque bearer token.
    BearerToken(BearerTokenCredential),
    /// A password credential.
    Password(PasswordCredential),
}

impl Credential {
    /// Returns the concrete type tag of this credential.
    #[must_use]
    pub const fn credential_type(&self) -> CredentialType {
        match self {
            Self::SecretKey(_) => CredentialType::SecretKey,
            Self::PublicKey(_) => CredentialType::PublicKey,
            Self::KeyPair(_) => CredentialType::KeyPair,
            Self::X509CertificateChainPublic(_) => CredentialType::X509CertificateChainPublic,
            Self::X509CertificateChainPrivate(_) => CredentialType::X509CertificateChainPrivate,
            Self::BearerToken(_) => CredentialType::BearerToken,
            Self::Password(_) => CredentialType::Password,
        }
    }

    /// Returns the algorithm name for algorithm-bearing variants.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        match self {
            Self::SecretKey(c) => Some(c.algorithm()),
            Self::PublicKey(c) => Some(c.algorithm()),
            Self::KeyPair(c) => Some(c.algorithm()),
            Self::X509CertificateChainPublic(c) => Some(c.algorithm()),
            Self::X509CertificateChainPrivate(c) => Some(c.algorithm()),
            Self::BearerToken(_) => None,
            Self::Password(c) => Some(c.algorithm()),
        }
    }

    /// Returns the algorithm parameters, when the credential carries any.
    #[must_use]
    pub fn parameters(&self) -> Option<&AlgorithmParameters> {
        match self {
            Self::Password(c) => c.parameters(),
            _ => None,
        }
    }
}
