//! Frame - Capture Unit 输出
//!
//! 单个传感器输出单元 (图像或音频块)。只在采集单元的缓冲区中短暂持有，
//! 写盘后即丢弃。

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 传感器帧
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// 单元内的采集序号 (从 0 开始，严格递增)
    pub sequence: u64,

    /// 相对于 t0 的采集时间
    pub offset: Duration,

    /// 数据载荷
    pub payload: FramePayload,
}

/// 帧数据载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FramePayload {
    /// 8-bit RGB 图像 (RGB / HiRes)
    Rgb8(ImageData),

    /// 16-bit 单通道图像 (深度毫米值，或热成像原始 centi-Kelvin)
    Gray16(Gray16Image),

    /// 摄氏度热成像
    Thermal(ThermalImage),

    /// 交错 PCM 音频块
    Audio(AudioBlock),
}

impl FramePayload {
    /// Short name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FramePayload::Rgb8(_) => "rgb8",
            FramePayload::Gray16(_) => "gray16",
            FramePayload::Thermal(_) => "thermal",
            FramePayload::Audio(_) => "audio",
        }
    }
}

/// 8-bit RGB 图像数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// 行优先 RGB 像素
    pub data: Bytes,
}

/// 16-bit 单通道图像
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gray16Image {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

/// 摄氏度温度图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalImage {
    pub width: u32,
    pub height: u32,
    pub celsius: Vec<f32>,
}

/// 音频块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioBlock {
    pub sample_rate: u32,
    pub channels: u16,
    /// 交错 16-bit 样本
    pub samples: Vec<i16>,
}
