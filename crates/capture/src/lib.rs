//! # Capture
//!
//! 单传感器采集核心。
//!
//! 负责：
//! - 同步启动屏障 (`StartSignal`)
//! - 按角色的帧变换 (热成像 centi-Kelvin → °C)
//! - 采集循环与分块落盘 (`CaptureUnit`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use capture::{CaptureUnit, FrameTransform, StartSignal};
//!
//! let start = StartSignal::new();
//! let unit = CaptureUnit::new(driver, sink, config.chunk_duration(), transform);
//!
//! // On the unit's own thread
//! let outcome = unit.run("session", SessionDuration::from_secs(60), &start, &cancel);
//! ```

mod signal;
mod transform;
mod unit;

pub use signal::StartSignal;
pub use transform::{centi_kelvin_to_celsius, FrameTransform};
pub use unit::{panic_message, CaptureUnit, UnitProgress};

pub use contracts::{SessionDuration, Termination, UnitOutcome};
