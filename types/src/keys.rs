//! Ed25519 key material carried by authorities and election messages.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An authority's block signing key as registered on its identity chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// The local node's signing secret. Not `Clone` or serializable; wiped on
/// drop. `Debug` prints a placeholder.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Signature over a volunteer or vote digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Placeholder carried by messages that have not been signed yet.
    pub const EMPTY: Self = Self([0u8; 64]);

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

/// Accepts both byte strings (bincode) and sequences (JSON arrays).
struct SignatureVisitor;

impl<'de> Visitor<'de> for SignatureVisitor {
    type Value = Signature;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a 64-byte signature")
    }

    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Signature, E> {
        <[u8; 64]>::try_from(v)
            .map(Signature)
            .map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Signature, A::Error> {
        let mut bytes = Vec::with_capacity(64);
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        self.visit_bytes::<A::Error>(&bytes)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(SignatureVisitor)
    }
}

/// Public half plus secret. Built by the `fedchain_crypto` key functions.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_survives_the_wire_codec() {
        let mut bytes = [0u8; 64];
        bytes[0] = 7;
        bytes[63] = 9;
        let sig = Signature(bytes);
        let encoded = bincode::serialize(&sig).unwrap();
        assert_eq!(bincode::deserialize::<Signature>(&encoded).unwrap(), sig);
    }

    #[test]
    fn short_signature_is_rejected() {
        let encoded = bincode::serialize(&serde_bytes_of(&[1u8; 10])).unwrap();
        assert!(bincode::deserialize::<Signature>(&encoded).is_err());
    }

    #[test]
    fn unsigned_placeholder_is_empty() {
        assert!(Signature::EMPTY.is_empty());
        assert!(!Signature([1u8; 64]).is_empty());
    }

    #[test]
    fn private_key_debug_hides_bytes() {
        assert_eq!(format!("{:?}", PrivateKey([0xAB; 32])), "PrivateKey(..)");
    }

    struct Raw<'a>(&'a [u8]);

    impl Serialize for Raw<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(self.0)
        }
    }

    fn serde_bytes_of(bytes: &[u8]) -> Raw<'_> {
        Raw(bytes)
    }
}
