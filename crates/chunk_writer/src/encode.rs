//! Chunk encoders
//!
//! - thermal: multi-page LZW TIFF, `f32` °C or raw `u16`
//! - depth: multi-page LZW TIFF, `u16`
//! - rgb / hires: Motion-JPEG (concatenated JPEG frames)
//! - audio: 16-bit PCM WAV

use std::io::{Seek, Write};

use contracts::{AudioBlock, Frame, FramePayload, SensorRole};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tiff::encoder::{colortype, compression::Lzw, TiffEncoder};

use crate::error::WriterError;

/// Default JPEG quality of video chunks
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// On-disk format of one role's chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFormat {
    /// Thermal TIFF stack
    ThermalTiff,
    /// Depth TIFF stack
    DepthTiff,
    /// Motion-JPEG stream
    Mjpeg { quality: u8 },
    /// PCM WAV
    Wav,
}

impl ChunkFormat {
    pub fn for_role(role: SensorRole) -> Self {
        match role {
            SensorRole::Thermal => ChunkFormat::ThermalTiff,
            SensorRole::Depth => ChunkFormat::DepthTiff,
            SensorRole::Rgb | SensorRole::HiRes => ChunkFormat::Mjpeg {
                quality: DEFAULT_JPEG_QUALITY,
            },
            SensorRole::Audio => ChunkFormat::Wav,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ChunkFormat::ThermalTiff | ChunkFormat::DepthTiff => "tiff",
            ChunkFormat::Mjpeg { .. } => "mjpeg",
            ChunkFormat::Wav => "wav",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ChunkFormat::ThermalTiff => "thermal tiff",
            ChunkFormat::DepthTiff => "depth tiff",
            ChunkFormat::Mjpeg { .. } => "mjpeg",
            ChunkFormat::Wav => "wav",
        }
    }

    /// Encode all frames into `out`. `frames` must not be empty.
    pub fn encode<W: Write + Seek>(&self, frames: &[Frame], out: W) -> Result<(), WriterError> {
        match self {
            ChunkFormat::ThermalTiff | ChunkFormat::DepthTiff => self.encode_tiff(frames, out),
            ChunkFormat::Mjpeg { quality } => self.encode_mjpeg(frames, out, *quality),
            ChunkFormat::Wav => self.encode_wav(frames, out),
        }
    }

    fn mismatch(&self, payload: &FramePayload) -> WriterError {
        WriterError::PayloadMismatch {
            format: self.name(),
            got: payload.kind(),
        }
    }

    fn encode_tiff<W: Write + Seek>(&self, frames: &[Frame], out: W) -> Result<(), WriterError> {
        let mut tiff = TiffEncoder::new(out)?;
        for frame in frames {
            match (&frame.payload, self) {
                (FramePayload::Thermal(image), ChunkFormat::ThermalTiff) => {
                    check_samples(image.width, image.height, 1, image.celsius.len())?;
                    tiff.write_image_with_compression::<colortype::Gray32Float, _>(
                        image.width,
                        image.height,
                        Lzw::default(),
                        &image.celsius,
                    )?;
                }
                (FramePayload::Gray16(image), _) => {
                    check_samples(image.width, image.height, 1, image.data.len())?;
                    tiff.write_image_with_compression::<colortype::Gray16, _>(
                        image.width,
                        image.height,
                        Lzw::default(),
                        &image.data,
                    )?;
                }
                (payload, _) => return Err(self.mismatch(payload)),
            }
        }
        Ok(())
    }

    fn encode_mjpeg<W: Write>(
        &self,
        frames: &[Frame],
        mut out: W,
        quality: u8,
    ) -> Result<(), WriterError> {
        for frame in frames {
            let FramePayload::Rgb8(image) = &frame.payload else {
                return Err(self.mismatch(&frame.payload));
            };
            check_samples(image.width, image.height, 3, image.data.len())?;
            JpegEncoder::new_with_quality(&mut out, quality).write_image(
                &image.data,
                image.width,
                image.height,
                ExtendedColorType::Rgb8,
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn encode_wav<W: Write + Seek>(&self, frames: &[Frame], out: W) -> Result<(), WriterError> {
        let blocks = frames
            .iter()
            .map(|frame| match &frame.payload {
                FramePayload::Audio(block) => Ok(block),
                other => Err(self.mismatch(other)),
            })
            .collect::<Result<Vec<&AudioBlock>, _>>()?;

        let Some(first) = blocks.first().copied() else {
            return Err(WriterError::Inconsistent("empty audio chunk".to_string()));
        };
        if let Some(odd) = blocks
            .iter()
            .find(|b| b.sample_rate != first.sample_rate || b.channels != first.channels)
        {
            return Err(WriterError::Inconsistent(format!(
                "audio format changed from {} Hz x{} to {} Hz x{}",
                first.sample_rate, first.channels, odd.sample_rate, odd.channels
            )));
        }

        let spec = hound::WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wav = hound::WavWriter::new(out, spec)?;
        for block in blocks {
            for &sample in &block.samples {
                wav.write_sample(sample)?;
            }
        }
        wav.finalize()?;
        Ok(())
    }
}

/// Buffer length must equal `width * height * channels` exactly; the image
/// encoders panic on anything else.
fn check_samples(width: u32, height: u32, channels: usize, len: usize) -> Result<(), WriterError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels));
    if expected != Some(len) {
        return Err(WriterError::Inconsistent(format!(
            "{width}x{height}x{channels} frame carries {len} samples"
        )));
    }
    Ok(())
}
