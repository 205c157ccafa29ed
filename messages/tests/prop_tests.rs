use fedchain_crypto::keypair_from_seed;
use fedchain_messages::{decode, encode, Message, Signed, VoteMessage};
use fedchain_types::{DbHeight, IdentityChainId, NetworkId};
use proptest::prelude::*;

proptest! {
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode(&bytes);
    }

    #[test]
    fn signed_vote_survives_the_wire(voter in 0u32..64, candidate in 0u32..64, slot in 0usize..8, height in 0u32..10_000) {
        let kp = keypair_from_seed(&[voter as u8; 32]);
        let vote = VoteMessage::signed(
            IdentityChainId::from_u32(voter),
            IdentityChainId::from_u32(candidate),
            slot,
            DbHeight::new(height),
            &kp.private,
            NetworkId::Local,
        );
        let decoded = decode(&encode(&Message::Vote(vote.clone())).unwrap()).unwrap();
        let Message::Vote(back) = decoded else {
            return Err(TestCaseError::fail("wrong variant"));
        };
        prop_assert_eq!(
            back.signing_digest(NetworkId::Local),
            vote.signing_digest(NetworkId::Local)
        );
        prop_assert_eq!(back.signature, vote.signature);
    }
}
