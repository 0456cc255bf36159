//! Encoding and decoding of composite underlying aliases.
//!
//! The backing container is keyed by a single textual alias, so the
//! credential identity quadruple is packed into one string:
//!
//! ```text
//! <alias_lc> "/" <credential_type_token> "/" [<algorithm_lc>] "/" [<params_b32>]
//! ```
//!
//! `alias_lc` and `algorithm_lc` are lower-cased in a locale-independent
//! manner, and `params_b32` is the lower-case, unpadded RFC 4648 base-32
//! encoding of the parameters' DER form. Strings not matching the grammar
//! belong to some other producer and are skipped at load time.

use data_encoding::{Encoding, Specification};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::credential::CredentialType;
use crate::params::AlgorithmParameters;

/// Grammar of a recognized underlying alias.
static INDEX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(.+)/([a-z0-9_]+)/([-a-z0-9_]+)?/([2-7a-z]+)?$").expect("valid alias pattern")
});

/// Lower-case RFC 4648 base-32, no padding.
static BASE32_LOWER: Lazy<Encoding> = Lazy::new(|| {
    let mut spec = Specification::new();
    spec.symbols.push_str("abcdefghijklmnopqrstuvwxyz234567");
    spec.encoding().expect("valid base32 specification")
});

/// A composite alias decoded back into its identity quadruple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAlias {
    /// The user-supplied alias, lower-cased.
    pub alias: String,
    /// The credential type.
    pub credential_type: CredentialType,
    /// The algorithm name, lower-cased, if one was encoded.
    pub algorithm: Option<String>,
    /// The algorithm parameters, if any were encoded.
    pub parameters: Option<AlgorithmParameters>,
}

/// Why an underlying alias could not be decoded.
#[derive(Debug, Error)]
pub enum AliasDecodeError {
    /// The string does not match the alias grammar; it belongs to some
    /// other producer.
    #[error("alias does not match the credential store grammar")]
    Unrecognized,

    /// The grammar matched but the credential type token is unknown.
    #[error("unknown credential type token '{0}'")]
    UnknownType(String),

    /// The grammar matched but the parameter payload could not be
    /// reconstructed.
    #[error("malformed algorithm parameters: {0}")]
    Parameters(String),
}

/// Builds the underlying alias for an identity quadruple.
///
/// Parameters are only encoded when an algorithm is present, matching the
/// decode grammar where a parameter payload implies an algorithm segment.
#[must_use]
pub fn encode(
    alias: &str,
    credential_type: CredentialType,
    algorithm: Option<&str>,
    parameters: Option<&AlgorithmParameters>,
) -> String {
    let mut out = String::with_capacity(64 + alias.len());
    out.push_str(&alias.to_lowercase());
    out.push('/');
    out.push_str(credential_type.token());
    out.push('/');
    if let Some(algorithm) = algorithm {
        out.push_str(&algorithm.to_lowercase());
        out.push('/');
        if let Some(parameters) = parameters {
            out.push_str(&BASE32_LOWER.encode(parameters.as_der()));
        }
    } else {
        out.push('/');
    }
    out
}

/// Decodes an underlying alias back into its identity quadruple.
///
/// # Errors
///
/// Returns [`AliasDecodeError::Unrecognized`] or
/// [`AliasDecodeError::UnknownType`] for entries written by another
/// producer, and [`AliasDecodeError::Parameters`] when the entry matches
/// the grammar but its parameter payload cannot be reconstructed.
pub fn decode(ks_alias: &str) -> Result<DecodedAlias, AliasDecodeError> {
    let captures = INDEX_PATTERN
        .captures(ks_alias)
        .ok_or(AliasDecodeError::Unrecognized)?;

    let alias = captures[1].to_string();
    let type_token = &captures[2];
    let credential_type = CredentialType::from_token(type_token)
        .ok_or_else(|| AliasDecodeError::UnknownType(type_token.to_string()))?;
    let algorithm = captures.get(3).map(|m| m.as_str().to_string());

    let parameters = match captures.get(4) {
        Some(payload) => {
            let encoded = BASE32_LOWER
                .decode(payload.as_str().as_bytes())
                .map_err(|e| AliasDecodeError::Parameters(e.to_string()))?;
            let parameters = AlgorithmParameters::from_der(encoded)
                .map_err(|e| AliasDecodeError::Parameters(e.to_string()))?;
            Some(parameters)
        }
        None => None,
    };

    Ok(DecodedAlias {
        alias,
        credential_type,
        algorithm,
        parameters,
    })
}
