//! Digests: Blake2b-256 for signing and fingerprints, SHA-256 for volunteer
//! priority.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

fn finish<D: Digest>(hasher: D) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize()[..32]);
    out
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Blake2b-256 of the concatenation of `parts`, without building it.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    parts.iter().for_each(|part| hasher.update(part));
    finish(hasher)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    finish(Sha256::new_with_prefix(data))
}
