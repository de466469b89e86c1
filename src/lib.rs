//! # Krist Mining Client
//!
//! An OpenCL accelerated proof-of-work miner for the Krist network.
//!
//! ## Architecture
//!
//! The client is built around a [`SharedState`](core::SharedState) object
//! shared between one mining thread per OpenCL device and a single network
//! task. The network task keeps a WebSocket connection to a Krist node,
//! publishes the current mining [`Target`](core::Target) into the shared
//! state, and drains found [`Solution`](core::Solution)s back out of it,
//! submitting at most one at a time.
//!
//! Miners dispatch the embedded OpenCL kernel over partitions of the nonce
//! space, interleaving lanes for the device's SIMD vector width, and abandon
//! an in-flight partition as soon as the target changes.

#![warn(rust_2018_idioms, unused_lifetimes, unused_qualifications)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;
pub mod workers;

pub use crate::config::Args;
pub use crate::core::{Address, Prefix, SharedState, ShortHash, Solution, Target};
pub use crate::error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        config::Args,
        core::{Address, Prefix, SharedState, ShortHash, Solution, Target},
        error::{Error, Result},
        protocol::network::{MiningEvents, NetOptions},
        workers::gpu::{Miner, MinerOptions},
    };
}
