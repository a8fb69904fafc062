//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Each capture unit measures time from its own `t0`, taken right after the
//!   shared start signal is released
//! - `Frame::sequence` orders frames within one unit; there is no cross-unit order

mod blueprint;
mod device;
mod error;
mod frame;
mod outcome;
mod role;
mod sink;

pub use blueprint::*;
pub use device::{CaptureDevice, DeviceDriver};
pub use error::*;
pub use frame::*;
pub use outcome::*;
pub use role::SensorRole;
pub use sink::*;
