//! Device driver boundary
//!
//! Separates session orchestration from vendor SDK details. A `DeviceDriver`
//! is plain configuration that may cross into a unit's execution context; the
//! `CaptureDevice` handle it opens never leaves that context.

use crate::{ContractError, FramePayload, SensorRole};

/// Device driver trait
///
/// Implemented once per backend (synthetic, vendor SDK, ...). The supervisor
/// builds drivers before launch and moves each into its unit's thread.
pub trait DeviceDriver: Send {
    /// Role this driver captures for
    fn role(&self) -> SensorRole;

    /// Open the physical device.
    ///
    /// Called inside the capture unit's own context, after launch.
    ///
    /// # Errors
    /// `ContractError::DeviceInit` when the device is absent or cannot be opened.
    fn initialize(&mut self) -> Result<Box<dyn CaptureDevice>, ContractError>;
}

/// Live device handle
///
/// Deliberately not `Send`: SDK handles are owned by the context that opened
/// them.
pub trait CaptureDevice {
    /// Blocking frame grab.
    ///
    /// Pacing comes from the device. `Ok(None)` means the device has ended
    /// (disconnect or end of stream).
    fn grab(&mut self) -> Result<Option<FramePayload>, ContractError>;
}
