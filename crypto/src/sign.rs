//! Ed25519 signatures over election digests.
//!
//! Callers hash first (see `fedchain_messages::signing`) and sign the 32-byte
//! digest, but nothing here depends on the input length.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use fedchain_types::{PrivateKey, PublicKey, Signature};

/// Deterministic: a given key and input always yield the same signature,
/// which lets a replayed delivery reproduce its outbound votes exactly.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    Signature(SigningKey::from_bytes(&private_key.0).sign(message).to_bytes())
}

/// `false` for malformed keys as well as bad signatures.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    if signature.is_empty() {
        return false;
    }
    VerifyingKey::from_bytes(&public_key.0)
        .map(|key| {
            key.verify(message, &ed25519_dalek::Signature::from_bytes(&signature.0))
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    const DIGEST: [u8; 32] = [0x5a; 32];

    #[test]
    fn vote_digest_verifies_under_its_signer_only() {
        let fed = keypair_from_seed(&[1u8; 32]);
        let audit = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(&DIGEST, &fed.private);
        assert!(verify_signature(&DIGEST, &sig, &fed.public));
        assert!(!verify_signature(&DIGEST, &sig, &audit.public));
    }

    #[test]
    fn altered_digest_is_rejected() {
        let fed = keypair_from_seed(&[1u8; 32]);
        let sig = sign_message(&DIGEST, &fed.private);
        let mut other = DIGEST;
        other[31] ^= 1;
        assert!(!verify_signature(&other, &sig, &fed.public));
    }

    #[test]
    fn replayed_signing_is_byte_identical() {
        let fed = keypair_from_seed(&[7u8; 32]);
        assert_eq!(
            sign_message(&DIGEST, &fed.private),
            sign_message(&DIGEST, &fed.private)
        );
    }

    #[test]
    fn unsigned_and_malformed_inputs_never_verify() {
        let fed = keypair_from_seed(&[1u8; 32]);
        assert!(!verify_signature(&DIGEST, &Signature::EMPTY, &fed.public));
        let sig = sign_message(&DIGEST, &fed.private);
        assert!(!verify_signature(&DIGEST, &sig, &PublicKey([0xFF; 32])));
    }
}
