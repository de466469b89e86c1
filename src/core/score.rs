//! Host reference score computation
//!
//! The GPU kernel computes the same quantities; these functions are the
//! reference the kernel is validated against, and they re-verify accepted
//! solutions on the host.

use crate::core::{Address, Nonce, ShortHash};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of the given bytes
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Interpret the first 6 bytes of a hash as a big-endian 48-bit score
pub fn score(hash: &[u8; 32]) -> i64 {
    (hash[5] as i64)
        | (hash[4] as i64) << 8
        | (hash[3] as i64) << 16
        | (hash[2] as i64) << 24
        | (hash[1] as i64) << 32
        | (hash[0] as i64) << 40
}

/// Score the hash of `address || prev_block || nonce`
pub fn solution_score(address: &Address, prev_block: &ShortHash, nonce: &Nonce) -> i64 {
    let mut message = Vec::with_capacity(34);
    message.extend_from_slice(address.as_bytes());
    message.extend_from_slice(prev_block.as_bytes());
    message.extend_from_slice(nonce.as_bytes());
    score(&sha256(&message))
}

/// Whether the nonce solves the target, i.e. its score is strictly below `work`
pub fn is_solution(address: &Address, prev_block: &ShortHash, nonce: &Nonce, work: i64) -> bool {
    solution_score(address, prev_block, nonce) < work
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sha256_reference_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_score_is_big_endian_48_bit() {
        let mut hash = [0u8; 32];
        hash[..6].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(score(&hash), 0x0102_0304_0506);

        // bytes past the sixth never contribute
        hash[6] = 0xff;
        hash[31] = 0xff;
        assert_eq!(score(&hash), 0x0102_0304_0506);
    }

    #[test]
    fn test_score_of_known_hash() {
        let hash = sha256(b"abc");
        // first 6 bytes of sha256("abc") are ba7816bf8f01
        assert_eq!(score(&hash), 0xba78_16bf_8f01);
    }

    #[test]
    fn test_solution_score_matches_concatenated_hash() {
        let address = Address::from_str("k5ztameslf").unwrap();
        let prev_block = ShortHash::from_str("000000000000").unwrap();
        let nonce = Nonce::from_solution_buffer(b"ab0123456789").unwrap();

        let hash = sha256(b"k5ztameslf000000000000ab0123456789");
        assert_eq!(solution_score(&address, &prev_block, &nonce), score(&hash));
    }

    #[test]
    fn test_is_solution_strict_comparison() {
        let address = Address::from_str("k5ztameslf").unwrap();
        let prev_block = ShortHash::from_str("000000000000").unwrap();
        let nonce = Nonce::from_solution_buffer(b"ab0123456789").unwrap();

        let s = solution_score(&address, &prev_block, &nonce);
        assert!(is_solution(&address, &prev_block, &nonce, s + 1));
        assert!(!is_solution(&address, &prev_block, &nonce, s));
    }
}
