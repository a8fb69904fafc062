//! Synthetic device implementation
//!
//! Implements the device driver boundary with generated frames paced at the
//! configured rate. Used when no vendor SDK is linked and for end-to-end runs
//! without hardware.

use std::f32::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    AudioBlock, CaptureDevice, ContractError, DeviceDriver, FramePayload, Gray16Image,
    ImageData, Resolution, SensorRole, StreamSpec,
};
use tracing::{debug, trace};

/// Audio block length produced per `grab()`
const AUDIO_BLOCK: Duration = Duration::from_millis(100);

/// Raw thermal baseline: 300 K in centi-Kelvin (~26.85 °C)
const THERMAL_BASELINE: u16 = 30_000;

/// Synthetic driver configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Stream parameters
    pub stream: StreamSpec,
    /// Device ends after this many frames
    pub frame_limit: Option<u64>,
}

/// Synthetic driver
///
/// Holds only configuration; the device handle is created by `initialize()`
/// inside the capture unit context.
pub struct SyntheticDriver {
    role: SensorRole,
    config: SyntheticConfig,
}

impl SyntheticDriver {
    /// Create new synthetic driver
    pub fn new(role: SensorRole, config: SyntheticConfig) -> Self {
        Self { role, config }
    }
}

impl DeviceDriver for SyntheticDriver {
    fn role(&self) -> SensorRole {
        self.role
    }

    fn initialize(&mut self) -> Result<Box<dyn CaptureDevice>, ContractError> {
        let interval = match self.config.stream {
            StreamSpec::Video { fps, .. } if fps > 0.0 => Duration::from_secs_f64(1.0 / fps),
            StreamSpec::Video { fps, .. } => {
                return Err(ContractError::device_init(
                    self.role,
                    format!("invalid frame rate {fps}"),
                ));
            }
            StreamSpec::Audio { .. } => AUDIO_BLOCK,
        };

        debug!(
            role = %self.role,
            interval_ms = interval.as_secs_f64() * 1000.0,
            frame_limit = ?self.config.frame_limit,
            "synthetic device opened"
        );

        Ok(Box::new(SyntheticDevice {
            role: self.role,
            stream: self.config.stream,
            frame_limit: self.config.frame_limit,
            interval,
            next_due: None,
            produced: 0,
            rgb_template: None,
        }))
    }
}

/// Live synthetic device
pub struct SyntheticDevice {
    role: SensorRole,
    stream: StreamSpec,
    frame_limit: Option<u64>,
    interval: Duration,
    next_due: Option<Instant>,
    produced: u64,
    rgb_template: Option<Bytes>,
}

impl SyntheticDevice {
    /// Sleep until the next frame is due, like a device-paced blocking grab
    fn pace(&mut self) {
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            thread::sleep(due - now);
        }
        // Do not accumulate debt when the consumer falls behind
        self.next_due = Some(due.max(now) + self.interval);
    }

    fn generate_payload(&mut self) -> FramePayload {
        let index = self.produced;
        match self.stream {
            StreamSpec::Video { resolution, .. } => match self.role {
                SensorRole::Thermal => {
                    FramePayload::Gray16(Self::thermal_image(resolution, index))
                }
                SensorRole::Depth => FramePayload::Gray16(Self::depth_image(resolution, index)),
                _ => {
                    let data = self
                        .rgb_template
                        .get_or_insert_with(|| Self::rgb_pattern(resolution))
                        .clone();
                    FramePayload::Rgb8(ImageData {
                        width: resolution.width,
                        height: resolution.height,
                        data,
                    })
                }
            },
            StreamSpec::Audio {
                sampling_rate,
                channels,
            } => FramePayload::Audio(Self::audio_block(sampling_rate, channels, index)),
        }
    }

    fn thermal_image(resolution: Resolution, index: u64) -> Gray16Image {
        let drift = (index % 200) as u16;
        let data = (0..resolution.height)
            .flat_map(|y| {
                (0..resolution.width)
                    .map(move |x| THERMAL_BASELINE + ((x + y) % 500) as u16 + drift)
            })
            .collect();
        Gray16Image {
            width: resolution.width,
            height: resolution.height,
            data,
        }
    }

    fn depth_image(resolution: Resolution, index: u64) -> Gray16Image {
        let offset = (index % 1000) as u16;
        let data = (0..resolution.height)
            .flat_map(|y| (0..resolution.width).map(move |x| 500 + ((x * 3 + y) % 3000) as u16))
            .map(|mm| mm.saturating_add(offset))
            .collect();
        Gray16Image {
            width: resolution.width,
            height: resolution.height,
            data,
        }
    }

    fn rgb_pattern(resolution: Resolution) -> Bytes {
        let mut data = Vec::with_capacity((resolution.width * resolution.height * 3) as usize);
        for y in 0..resolution.height {
            for x in 0..resolution.width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(128);
            }
        }
        Bytes::from(data)
    }

    fn audio_block(sampling_rate: u32, channels: u16, index: u64) -> AudioBlock {
        let frames = (sampling_rate as u64 * AUDIO_BLOCK.as_millis() as u64 / 1000) as usize;
        let start = index as usize * frames;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for n in 0..frames {
            let t = (start + n) as f32 / sampling_rate as f32;
            let value = ((TAU * 440.0 * t).sin() * i16::MAX as f32 * 0.25) as i16;
            samples.extend(std::iter::repeat(value).take(channels as usize));
        }
        AudioBlock {
            sample_rate: sampling_rate,
            channels,
            samples,
        }
    }
}

impl CaptureDevice for SyntheticDevice {
    fn grab(&mut self) -> Result<Option<FramePayload>, ContractError> {
        if self.frame_limit.is_some_and(|limit| self.produced >= limit) {
            debug!(role = %self.role, produced = self.produced, "synthetic device exhausted");
            return Ok(None);
        }

        self.pace();
        let payload = self.generate_payload();
        self.produced += 1;

        trace!(
            role = %self.role,
            index = self.produced,
            kind = payload.kind(),
            "synthetic frame produced"
        );

        Ok(Some(payload))
    }
}
