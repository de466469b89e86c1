//! Core types and structures for the mining client
//!
//! This module contains the fundamental types shared between the network
//! task and the mining threads: addresses, targets, solutions, the host
//! reference score, and the shared mining state.

mod address;
mod score;
mod state;
mod target;

pub use address::{Address, Prefix};
pub use score::{is_solution, score, sha256, solution_score};
pub use state::SharedState;
pub use target::{Nonce, ShortHash, Solution, Target};

/// Constants for the mining protocol
pub mod constants {
    /// Length of a Krist address in bytes
    pub const ADDRESS_LENGTH: usize = 10;

    /// Length of a block short hash in bytes
    pub const SHORT_HASH_LENGTH: usize = 12;

    /// Length of a nonce in bytes
    pub const NONCE_LENGTH: usize = 12;

    /// Length of a miner prefix in bytes
    pub const PREFIX_LENGTH: usize = 2;

    /// Size of the kernel's solution output buffer in bytes.
    ///
    /// The kernel may write up to this many bytes; only the first
    /// [`NONCE_LENGTH`] are meaningful, the rest is padding.
    pub const SOLUTION_BUFFER_SIZE: usize = 15;
}

#[cfg(test)]
mod tests {
    use super::constants::*;

    #[test]
    fn test_constants() {
        assert_eq!(ADDRESS_LENGTH, 10);
        assert_eq!(SHORT_HASH_LENGTH, 12);
        assert_eq!(NONCE_LENGTH, 12);
        assert_eq!(PREFIX_LENGTH, 2);
        assert!(SOLUTION_BUFFER_SIZE >= NONCE_LENGTH);
    }
}
