//! Per-role frame transforms
//!
//! Applied to every grabbed payload before it is buffered.

use contracts::{ContractError, FramePayload, SensorConfig, SensorRole, ThermalImage};

/// Centi-Kelvin offset: °C = raw / 100 - 273.15
const KELVIN_OFFSET: f32 = 273.15;

/// Frame transform selected from the sensor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTransform {
    /// Payload buffered as grabbed
    Passthrough,
    /// Raw thermal centi-Kelvin converted to °C
    ThermalCelsius,
}

impl FrameTransform {
    /// Transform for one configured sensor
    pub fn for_sensor(role: SensorRole, config: &SensorConfig) -> Self {
        match role {
            SensorRole::Thermal if config.to_celsius => FrameTransform::ThermalCelsius,
            _ => FrameTransform::Passthrough,
        }
    }

    /// Apply to one payload.
    ///
    /// # Errors
    /// `ContractError::Transform` when the payload type does not fit.
    pub fn apply(
        &self,
        role: SensorRole,
        payload: FramePayload,
    ) -> Result<FramePayload, ContractError> {
        match self {
            FrameTransform::Passthrough => Ok(payload),
            FrameTransform::ThermalCelsius => match payload {
                FramePayload::Gray16(raw) => {
                    let expected = raw.width as usize * raw.height as usize;
                    if raw.data.len() != expected {
                        return Err(ContractError::transform(
                            role,
                            format!(
                                "thermal frame {}x{} has {} pixels",
                                raw.width,
                                raw.height,
                                raw.data.len()
                            ),
                        ));
                    }
                    Ok(FramePayload::Thermal(ThermalImage {
                        width: raw.width,
                        height: raw.height,
                        celsius: raw.data.iter().map(|&v| centi_kelvin_to_celsius(v)).collect(),
                    }))
                }
                // Driver already converted
                FramePayload::Thermal(image) => Ok(FramePayload::Thermal(image)),
                other => Err(ContractError::transform(
                    role,
                    format!("expected raw thermal frame, got {}", other.kind()),
                )),
            },
        }
    }
}

/// Raw thermal value (K * 100) to degrees Celsius
pub fn centi_kelvin_to_celsius(raw: u16) -> f32 {
    raw as f32 / 100.0 - KELVIN_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AudioBlock, Gray16Image};

    fn raw_thermal(values: Vec<u16>) -> FramePayload {
        FramePayload::Gray16(Gray16Image {
            width: values.len() as u32,
            height: 1,
            data: values,
        })
    }

    #[test]
    fn test_centi_kelvin_conversion() {
        assert!((centi_kelvin_to_celsius(27315) - 0.0).abs() < 1e-3);
        assert!((centi_kelvin_to_celsius(31015) - 37.0).abs() < 1e-3);
    }

    #[test]
    fn test_selection_follows_config() {
        let mut config = SensorConfig::video(8.7, 160, 120, 2.0);
        assert_eq!(
            FrameTransform::for_sensor(SensorRole::Thermal, &config),
            FrameTransform::ThermalCelsius
        );
        assert_eq!(
            FrameTransform::for_sensor(SensorRole::Depth, &config),
            FrameTransform::Passthrough
        );

        config.to_celsius = false;
        assert_eq!(
            FrameTransform::for_sensor(SensorRole::Thermal, &config),
            FrameTransform::Passthrough
        );
    }

    #[test]
    fn test_thermal_celsius_converts_every_pixel() {
        let out = FrameTransform::ThermalCelsius
            .apply(SensorRole::Thermal, raw_thermal(vec![27315, 29315]))
            .unwrap();
        match out {
            FramePayload::Thermal(image) => {
                assert_eq!(image.width, 2);
                assert!((image.celsius[0] - 0.0).abs() < 1e-3);
                assert!((image.celsius[1] - 20.0).abs() < 1e-3);
            }
            other => panic!("unexpected payload {}", other.kind()),
        }
    }

    #[test]
    fn test_thermal_celsius_rejects_audio() {
        let audio = FramePayload::Audio(AudioBlock {
            sample_rate: 44_100,
            channels: 1,
            samples: vec![0; 16],
        });
        let err = FrameTransform::ThermalCelsius
            .apply(SensorRole::Thermal, audio)
            .unwrap_err();
        assert!(err.to_string().contains("audio"));
    }

    #[test]
    fn test_thermal_celsius_rejects_bad_dimensions() {
        let bad = FramePayload::Gray16(Gray16Image {
            width: 4,
            height: 4,
            data: vec![0; 3],
        });
        assert!(FrameTransform::ThermalCelsius
            .apply(SensorRole::Thermal, bad)
            .is_err());
    }
}
