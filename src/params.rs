//! Algorithm parameters and their value-equality map key.

use std::fmt;
use std::hash::{Hash, Hasher};

use der::asn1::AnyRef;
use der::Decode;

/// An opaque, DER-encoded algorithm parameter record.
///
/// The store never interprets parameters; it only transports their encoded
/// form through the underlying alias and compares them structurally.
#[derive(Clone, PartialEq, Eq)]
pub struct AlgorithmParameters {
    encoded: Vec<u8>,
}

impl AlgorithmParameters {
    /// Wraps the DER encoding of an algorithm parameter record.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not exactly one well-formed DER
    /// element.
    pub fn from_der(encoded: Vec<u8>) -> der::Result<Self> {
        AnyRef::from_der(&encoded)?;
        Ok(Self { encoded })
    }

    /// Returns the parameters' DER bytes.
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.encoded
    }
}

impl fmt::Debug for AlgorithmParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AlgorithmParameters({})", hex::encode(&self.encoded))
    }
}

/// Value-equality wrapper around [`AlgorithmParameters`].
///
/// The hash is computed once on construction; equality is structural over
/// the encoded form, which makes it reflexive, symmetric and transitive.
#[derive(Debug, Clone)]
pub struct ParamKey {
    parameters: AlgorithmParameters,
    hash: u64,
}

impl ParamKey {
    /// Wraps a parameter record, precomputing its hash.
    #[must_use]
    pub fn new(parameters: AlgorithmParameters) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        parameters.encoded.hash(&mut hasher);
        let hash = hasher.finish();
        Self { parameters, hash }
    }

    /// Returns the wrapped parameter record.
    #[must_use]
    pub const fn parameters(&self) -> &AlgorithmParameters {
        &self.parameters
    }
}

impl PartialEq for ParamKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.parameters == other.parameters
    }
}

impl Eq for ParamKey {}

impl Hash for ParamKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(bytes: &[u8]) -> AlgorithmParameters {
        AlgorithmParameters::from_der(bytes.to_vec()).expect("valid DER")
    }

    #[test]
    fn test_rejects_malformed_der() {
        assert!(AlgorithmParameters::from_der(vec![0x30]).is_err());
        // trailing garbage after a complete element
        assert!(AlgorithmParameters::from_der(vec![0x05, 0x00, 0xff]).is_err());
    }

    #[test]
    fn test_param_key_equality() {
        // OCTET STRING "ab" and NULL
        let a = ParamKey::new(params(&[0x04, 0x02, 0x61, 0x62]));
        let b = ParamKey::new(params(&[0x04, 0x02, 0x61, 0x62]));
        let c = ParamKey::new(params(&[0x05, 0x00]));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut ha = std::collections::hash_map::DefaultHasher::new();
        let mut hb = std::collections::hash_map::DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }
}
