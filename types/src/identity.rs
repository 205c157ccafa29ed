//! Identity chain IDs, the unique key of every authority.

use serde::{Deserialize, Serialize};
use std::fmt;


/// The 32-byte chain ID of a server identity.
///
/// Ordering is byte-lexicographic. Leader slots are assigned in this order and
/// the election tie-break picks the lowest ID, so the derived `Ord` is part of
/// the protocol.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityChainId([u8; 32]);

impl IdentityChainId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build an identity whose first four bytes are `n` in big-endian order.
    ///
    /// Lexicographic order of the result matches numeric order of `n`, which
    /// keeps simulated rosters readable.
    pub fn from_u32(n: u32) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short form used in logs: the first four bytes in hex.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for IdentityChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID-{}", self.short())
    }
}

impl fmt::Display for IdentityChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u32_orders_numerically() {
        let a = IdentityChainId::from_u32(1);
        let b = IdentityChainId::from_u32(2);
        let c = IdentityChainId::from_u32(256);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn debug_uses_short_form() {
        let id = IdentityChainId::from_u32(0x0102_0304);
        assert_eq!(format!("{id:?}"), "ID-01020304");
    }

    #[test]
    fn display_is_full_hex() {
        let id = IdentityChainId::from_u32(1);
        assert_eq!(id.to_string().len(), 64);
        assert!(id.to_string().starts_with("00000001"));
    }
}
