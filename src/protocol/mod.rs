//! Krist node communication
//!
//! The node is reached in two steps: an HTTP POST to the bootstrap endpoint
//! returns a one-shot WebSocket URL, and all further traffic flows over that
//! WebSocket as JSON text frames.

pub mod messages;
pub mod network;
pub mod submit;

pub use messages::{BootstrapResponse, ServerMessage, SubmitBlock};
pub use network::{MiningEvents, NetOptions, NoEvents};
pub use submit::SubmitState;
