//! Mining workers and device utilities
//!
//! One [`Miner`] owns one OpenCL device (context, queue, program) and runs a
//! blocking dispatch loop against the shared state. Device enumeration and
//! scoring live in [`device`].

pub mod device;
pub mod gpu;

pub use device::{all_devices, score_device, unique_id, DeviceExt};
pub use gpu::{Miner, MinerOptions};
