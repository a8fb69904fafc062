//! # Devices
//!
//! Device driver boundary module.
//!
//! Responsibilities:
//! - Build a `DeviceDriver` per configured role
//! - Provide the synthetic backend (no hardware required)
//! - Provide scripted drivers for fault-injection tests
//! - Resolve physical video devices to logical roles

pub mod registry;
pub mod resolver;
pub mod scripted;
pub mod synthetic;

pub use contracts::{CaptureDevice, DeviceDriver, SensorRole};
pub use registry::{BackendRegistry, DriverFactory};
pub use resolver::{DeviceNode, DeviceProbe, RoleMapping, RoleResolver, UdevProbe};
pub use scripted::{ScriptProbe, ScriptStep, ScriptedDriver};
pub use synthetic::{SyntheticConfig, SyntheticDevice, SyntheticDriver};
