//! Driver construction from configuration
//!
//! Maps a role's `SensorConfig` to a driver for its backend. Runs before any
//! unit context is launched, so configuration problems surface as startup
//! errors.

use contracts::{ContractError, DeviceBackend, DeviceDriver, SensorConfig, SensorRole};
use tracing::{debug, instrument};

use crate::synthetic::{SyntheticConfig, SyntheticDriver};

/// Builds device drivers for configured roles
pub trait DriverFactory: Send + Sync {
    /// Build the driver for one role.
    ///
    /// # Errors
    /// Configuration errors (missing stream fields, unsupported backend).
    fn build(
        &self,
        role: SensorRole,
        config: &SensorConfig,
    ) -> Result<Box<dyn DeviceDriver>, ContractError>;
}

/// Default factory: dispatches on `SensorConfig::backend`
#[derive(Debug, Default, Clone, Copy)]
pub struct BackendRegistry;

impl DriverFactory for BackendRegistry {
    #[instrument(name = "driver_build", skip(self, config), fields(role = %role))]
    fn build(
        &self,
        role: SensorRole,
        config: &SensorConfig,
    ) -> Result<Box<dyn DeviceDriver>, ContractError> {
        let stream = config.stream(role)?;
        match config.backend {
            DeviceBackend::Synthetic => {
                debug!(?stream, channel_index = ?config.channel_index, "building synthetic driver");
                Ok(Box::new(SyntheticDriver::new(
                    role,
                    SyntheticConfig {
                        stream,
                        frame_limit: config.frame_limit,
                    },
                )))
            }
        }
    }
}
