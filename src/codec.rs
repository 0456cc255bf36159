//! Credential codecs.
//!
//! The backing container only understands opaque secret-key blobs and
//! private-key-plus-chain entries, so every credential variant is encoded
//! into one of those two shapes. All variants except the private chain ride
//! in a synthetic secret-key entry whose algorithm is the PKCS#7 `data`
//! OID; the private chain maps onto the container's native entry kind.
//!
//! Encodings are deterministic DER so that a container written on one
//! platform decodes identically on another. Password credentials fan out by
//! algorithm family; the decode direction recovers the algorithm from the
//! composite alias, not from the blob.

use der::asn1::{AnyRef, OctetStringRef};
use der::{Decode, Encode, Reader, SliceReader, Tag, Tagged};
use thiserror::Error;

use crate::credential::{
    BearerTokenCredential, Credential, CredentialType, KeyPairCredential, PublicKeyCredential,
    SecretKeyCredential, X509Certificate, X509CertificateChainPrivateCredential,
    X509CertificateChainPublicCredential,
};
use crate::keystore::KeyStoreEntry;
use crate::password::{
    ClearPasswordSpec, DigestPasswordSpec, HashPasswordSpec, IteratedSaltedHashPasswordSpec,
    MaskedPasswordSpec, OneTimePasswordSpec, PasswordCredential, PasswordFamily, PasswordSpec,
    SaltedHashPasswordSpec,
};

/// Algorithm tag of synthetic secret-key entries: the PKCS#7 `data` OID.
pub const DATA_OID: &str = "1.2.840.113549.1.7.1";

/// Errors raised while encoding or decoding credential blobs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A DER encoding or decoding failure.
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// An encoded string field is not valid UTF-8.
    #[error("malformed UTF-8 in encoded credential")]
    Utf8,

    /// The password algorithm is outside the closed set.
    #[error("unsupported password algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The password spec record does not have the shape its algorithm
    /// requires.
    #[error("password spec does not match the encoding of algorithm '{0}'")]
    SpecMismatch(String),

    /// A certificate chain credential with no certificates.
    #[error("certificate chain must not be empty")]
    EmptyChain,

    /// The encoded certificate count disagrees with the chain contents.
    #[error("certificate count does not match chain contents")]
    CountMismatch,

    /// The index matched an algorithm-bearing type without an algorithm.
    #[error("credential algorithm is missing from the index entry")]
    MissingAlgorithm,

    /// Data remains after the last expected element.
    #[error("trailing data after encoded credential")]
    TrailingData,

    /// The underlying entry kind contradicts the indexed credential type.
    #[error("expected a {expected} entry, found a {found} entry")]
    WrongEntryKind {
        /// The entry kind the credential type requires.
        expected: &'static str,
        /// The entry kind actually found.
        found: &'static str,
    },
}

// Encoding

/// Encodes a credential into the container entry that carries it.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedAlgorithm`] or
/// [`CodecError::SpecMismatch`] for password credentials outside the closed
/// set, and DER errors for malformed key or certificate material.
pub fn encode(credential: &Credential) -> Result<KeyStoreEntry, CodecError> {
    match credential {
        Credential::SecretKey(c) => Ok(KeyStoreEntry::SecretKey {
            algorithm: c.algorithm().to_string(),
            key: c.key_bytes().to_vec(),
        }),
        Credential::PublicKey(c) => Ok(data_entry(c.spki().to_vec())),
        Credential::KeyPair(c) => encode_key_pair(c),
        Credential::X509CertificateChainPublic(c) => encode_public_chain(c),
        Credential::X509CertificateChainPrivate(c) => encode_private_chain(c),
        Credential::BearerToken(c) => Ok(data_entry(c.token().as_bytes().to_vec())),
        Credential::Password(c) => Ok(data_entry(encode_password(c)?)),
    }
}

/// `SEQUENCE { publicSPKI, privatePKCS8 }`, each half written as its
/// already-encoded DER element.
fn encode_key_pair(credential: &KeyPairCredential) -> Result<KeyStoreEntry, CodecError> {
    // both halves must be single DER elements or the decode split is lost
    AnyRef::from_der(credential.public_spki())?;
    AnyRef::from_der(credential.private_pkcs8())?;

    let mut content =
        Vec::with_capacity(credential.public_spki().len() + credential.private_pkcs8().len());
    content.extend_from_slice(credential.public_spki());
    content.extend_from_slice(credential.private_pkcs8());
    Ok(data_entry(sequence(&content)?))
}

/// `INTEGER count` followed by `SEQUENCE { certDER, certDER, ... }`.
fn encode_public_chain(
    credential: &X509CertificateChainPublicCredential,
) -> Result<KeyStoreEntry, CodecError> {
    if credential.chain().is_empty() {
        return Err(CodecError::EmptyChain);
    }
    let count = u32::try_from(credential.chain().len()).map_err(|_| CodecError::CountMismatch)?;

    let mut content = Vec::new();
    for certificate in credential.chain() {
        AnyRef::from_der(certificate.der())?;
        content.extend_from_slice(certificate.der());
    }

    let mut bytes = count.to_der()?;
    bytes.extend_from_slice(&sequence(&content)?);
    Ok(data_entry(bytes))
}

/// The one variant the container supports natively.
fn encode_private_chain(
    credential: &X509CertificateChainPrivateCredential,
) -> Result<KeyStoreEntry, CodecError> {
    if credential.chain().is_empty() {
        return Err(CodecError::EmptyChain);
    }
    AnyRef::from_der(credential.private_pkcs8())?;
    for certificate in credential.chain() {
        AnyRef::from_der(certificate.der())?;
    }
    Ok(KeyStoreEntry::PrivateKeyChain {
        private_key: credential.private_pkcs8().to_vec(),
        chain: credential
            .chain()
            .iter()
            .map(|c| c.der().to_vec())
            .collect(),
    })
}

/// Algorithm-specific password encodings; the family table decides the
/// shape and the spec record must agree with it.
fn encode_password(credential: &PasswordCredential) -> Result<Vec<u8>, CodecError> {
    let algorithm = credential.algorithm();
    let family = PasswordFamily::of(algorithm)
        .ok_or_else(|| CodecError::UnsupportedAlgorithm(algorithm.to_string()))?;

    match (family, credential.spec()) {
        (PasswordFamily::IteratedSaltedHash, PasswordSpec::IteratedSaltedHash(spec)) => {
            let mut content = octet_string(&spec.hash)?;
            content.extend_from_slice(&octet_string(&spec.salt)?);
            content.extend_from_slice(&spec.iteration_count.to_der()?);
            Ok(sequence(&content)?)
        }
        (PasswordFamily::Clear, PasswordSpec::Clear(spec)) => {
            Ok(octet_string(spec.password.as_bytes())?)
        }
        (PasswordFamily::Digest, PasswordSpec::Digest(spec)) => {
            let mut content = octet_string(spec.username.as_bytes())?;
            content.extend_from_slice(&octet_string(spec.realm.as_bytes())?);
            content.extend_from_slice(&octet_string(&spec.digest)?);
            Ok(sequence(&content)?)
        }
        (PasswordFamily::OneTime, PasswordSpec::OneTime(spec)) => {
            let mut content = octet_string(&spec.hash)?;
            content.extend_from_slice(&octet_string(&spec.seed)?);
            content.extend_from_slice(&spec.sequence_number.to_der()?);
            Ok(sequence(&content)?)
        }
        (PasswordFamily::SaltedHash, PasswordSpec::SaltedHash(spec)) => {
            let mut content = octet_string(&spec.hash)?;
            content.extend_from_slice(&octet_string(&spec.salt)?);
            Ok(sequence(&content)?)
        }
        (PasswordFamily::SimpleHash, PasswordSpec::SimpleHash(spec)) => {
            Ok(sequence(&octet_string(&spec.digest)?)?)
        }
        (PasswordFamily::Masked, PasswordSpec::Masked(spec)) => {
            let mut content = octet_string(spec.initial_key_material.as_bytes())?;
            content.extend_from_slice(&spec.iteration_count.to_der()?);
            content.extend_from_slice(&octet_string(&spec.salt)?);
            content.extend_from_slice(&octet_string(&spec.masked_password_bytes)?);
            Ok(sequence(&content)?)
        }
        _ => Err(CodecError::SpecMismatch(algorithm.to_string())),
    }
}

// Decoding

/// Decodes a container entry back into a credential.
///
/// The concrete type and algorithm come from the index match, not from the
/// blob; the blob only carries the variant's payload.
///
/// # Errors
///
/// Returns [`CodecError::WrongEntryKind`] when the entry kind contradicts
/// the credential type, and decoding errors for malformed payloads.
pub fn decode(
    entry: &KeyStoreEntry,
    credential_type: CredentialType,
    algorithm: Option<&str>,
) -> Result<Credential, CodecError> {
    match credential_type {
        CredentialType::SecretKey => match entry {
            KeyStoreEntry::SecretKey { algorithm, key } => Ok(Credential::SecretKey(
                SecretKeyCredential::new(algorithm.clone(), key.clone()),
            )),
            other => Err(wrong_kind(other)),
        },
        CredentialType::PublicKey => {
            let bytes = data_bytes(entry)?;
            let algorithm = algorithm.ok_or(CodecError::MissingAlgorithm)?;
            Ok(Credential::PublicKey(PublicKeyCredential::new(
                algorithm,
                bytes.to_vec(),
            )))
        }
        CredentialType::KeyPair => decode_key_pair(entry, algorithm),
        CredentialType::X509CertificateChainPublic => decode_public_chain(entry, algorithm),
        CredentialType::X509CertificateChainPrivate => match entry {
            KeyStoreEntry::PrivateKeyChain { private_key, chain } => {
                let algorithm = algorithm.ok_or(CodecError::MissingAlgorithm)?;
                Ok(Credential::X509CertificateChainPrivate(
                    X509CertificateChainPrivateCredential::new(
                        algorithm,
                        private_key.clone(),
                        chain.iter().cloned().map(X509Certificate::new).collect(),
                    ),
                ))
            }
            other => Err(CodecError::WrongEntryKind {
                expected: "private key",
                found: other.kind(),
            }),
        },
        CredentialType::BearerToken => {
            let bytes = data_bytes(entry)?;
            let token = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::Utf8)?;
            Ok(Credential::BearerToken(BearerTokenCredential::new(token)))
        }
        CredentialType::Password => {
            let bytes = data_bytes(entry)?;
            let algorithm = algorithm.ok_or(CodecError::MissingAlgorithm)?;
            decode_password(algorithm, bytes)
        }
    }
}

fn decode_key_pair(
    entry: &KeyStoreEntry,
    algorithm: Option<&str>,
) -> Result<Credential, CodecError> {
    let bytes = data_bytes(entry)?;
    let algorithm = algorithm.ok_or(CodecError::MissingAlgorithm)?;

    let content = sequence_content(bytes)?;
    let mut reader = SliceReader::new(content)?;
    let public_spki = read_element(&mut reader)?;
    let private_pkcs8 = read_element(&mut reader)?;
    ensure_finished(&reader)?;

    Ok(Credential::KeyPair(KeyPairCredential::new(
        algorithm,
        public_spki,
        private_pkcs8,
    )))
}

fn decode_public_chain(
    entry: &KeyStoreEntry,
    algorithm: Option<&str>,
) -> Result<Credential, CodecError> {
    let bytes = data_bytes(entry)?;
    let algorithm = algorithm.ok_or(CodecError::MissingAlgorithm)?;

    let mut reader = SliceReader::new(bytes)?;
    let count = u32::decode(&mut reader)?;
    let chain_sequence = AnyRef::decode(&mut reader)?;
    chain_sequence.tag().assert_eq(Tag::Sequence)?;
    ensure_finished(&reader)?;

    let mut chain = Vec::with_capacity(count as usize);
    let mut certificates = SliceReader::new(chain_sequence.value())?;
    while !certificates.is_finished() {
        chain.push(X509Certificate::new(read_element(&mut certificates)?));
    }
    if chain.len() != count as usize {
        return Err(CodecError::CountMismatch);
    }

    Ok(Credential::X509CertificateChainPublic(
        X509CertificateChainPublicCredential::new(algorithm, chain),
    ))
}

fn decode_password(algorithm: &str, bytes: &[u8]) -> Result<Credential, CodecError> {
    let family = PasswordFamily::of(algorithm)
        .ok_or_else(|| CodecError::UnsupportedAlgorithm(algorithm.to_string()))?;

    let spec = match family {
        PasswordFamily::Clear => {
            let mut reader = SliceReader::new(bytes)?;
            let password = read_utf8(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::Clear(ClearPasswordSpec { password })
        }
        PasswordFamily::Digest => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let username = read_utf8(&mut reader)?;
            let realm = read_utf8(&mut reader)?;
            let digest = read_octet_string(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::Digest(DigestPasswordSpec {
                username,
                realm,
                digest,
            })
        }
        PasswordFamily::SimpleHash => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let digest = read_octet_string(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::SimpleHash(HashPasswordSpec { digest })
        }
        PasswordFamily::SaltedHash => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let hash = read_octet_string(&mut reader)?;
            let salt = read_octet_string(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::SaltedHash(SaltedHashPasswordSpec { hash, salt })
        }
        PasswordFamily::IteratedSaltedHash => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let hash = read_octet_string(&mut reader)?;
            let salt = read_octet_string(&mut reader)?;
            let iteration_count = u32::decode(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::IteratedSaltedHash(IteratedSaltedHashPasswordSpec {
                hash,
                salt,
                iteration_count,
            })
        }
        PasswordFamily::OneTime => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let hash = read_octet_string(&mut reader)?;
            let seed = read_octet_string(&mut reader)?;
            let sequence_number = u32::decode(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::OneTime(OneTimePasswordSpec {
                hash,
                seed,
                sequence_number,
            })
        }
        PasswordFamily::Masked => {
            let content = sequence_content(bytes)?;
            let mut reader = SliceReader::new(content)?;
            let initial_key_material = read_utf8(&mut reader)?;
            let iteration_count = u32::decode(&mut reader)?;
            let salt = read_octet_string(&mut reader)?;
            let masked_password_bytes = read_octet_string(&mut reader)?;
            ensure_finished(&reader)?;
            PasswordSpec::Masked(MaskedPasswordSpec {
                initial_key_material,
                iteration_count,
                salt,
                masked_password_bytes,
            })
        }
    };

    Ok(Credential::Password(PasswordCredential::new(
        algorithm, spec,
    )))
}

// DER helpers

/// Wraps payload bytes in a synthetic secret-key entry tagged with the
/// `data` OID.
fn data_entry(key: Vec<u8>) -> KeyStoreEntry {
    KeyStoreEntry::SecretKey {
        algorithm: DATA_OID.to_string(),
        key,
    }
}

/// Returns the payload of a synthetic secret-key entry.
fn data_bytes(entry: &KeyStoreEntry) -> Result<&[u8], CodecError> {
    match entry {
        KeyStoreEntry::SecretKey { key, .. } => Ok(key),
        other => Err(wrong_kind(other)),
    }
}

fn wrong_kind(found: &KeyStoreEntry) -> CodecError {
    CodecError::WrongEntryKind {
        expected: "secret key",
        found: found.kind(),
    }
}

/// Encodes a `SEQUENCE` whose content is the given pre-encoded elements.
fn sequence(content: &[u8]) -> der::Result<Vec<u8>> {
    AnyRef::new(Tag::Sequence, content)?.to_der()
}

/// Encodes an `OCTET STRING`.
fn octet_string(bytes: &[u8]) -> der::Result<Vec<u8>> {
    OctetStringRef::new(bytes)?.to_der()
}

/// Unwraps a single top-level `SEQUENCE` and returns its content.
fn sequence_content(bytes: &[u8]) -> Result<&[u8], CodecError> {
    let any = AnyRef::from_der(bytes)?;
    any.tag().assert_eq(Tag::Sequence)?;
    Ok(any.value())
}

/// Reads one complete element, header included, as raw DER bytes.
fn read_element(reader: &mut SliceReader<'_>) -> Result<Vec<u8>, CodecError> {
    let header = reader.peek_header()?;
    let total = (header.encoded_len()? + header.length)?;
    Ok(reader.read_slice(total)?.to_vec())
}

fn read_octet_string(reader: &mut SliceReader<'_>) -> Result<Vec<u8>, CodecError> {
    Ok(OctetStringRef::decode(reader)?.as_bytes().to_vec())
}

fn read_utf8(reader: &mut SliceReader<'_>) -> Result<String, CodecError> {
    String::from_utf8(read_octet_string(reader)?).map_err(|_| CodecError::Utf8)
}

fn ensure_finished(reader: &SliceReader<'_>) -> Result<(), CodecError> {
    if reader.is_finished() {
        Ok(())
    } else {
        Err(CodecError::TrailingData)
    }
}
