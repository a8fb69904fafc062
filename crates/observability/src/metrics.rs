//! 采集指标收集模块
//!
//! 记录采集单元、分块写入与会话阶段的运行指标。

use metrics::{counter, gauge, histogram};

/// 记录一帧进入缓冲区
pub fn record_frame_captured(role: &str) {
    counter!("capture_rig_frames_total", "role" => role.to_string()).increment(1);
}

/// 记录当前缓冲区深度 (帧数)
pub fn record_buffer_depth(role: &str, depth: usize) {
    gauge!("capture_rig_buffer_depth", "role" => role.to_string()).set(depth as f64);
}

/// 记录一个分块成功写盘
pub fn record_chunk_written(role: &str, frames: usize, bytes: u64, latency_ms: f64) {
    counter!("capture_rig_chunks_written_total", "role" => role.to_string()).increment(1);
    counter!("capture_rig_chunk_bytes_total", "role" => role.to_string()).increment(bytes);
    histogram!("capture_rig_chunk_frames", "role" => role.to_string()).record(frames as f64);
    histogram!("capture_rig_flush_latency_ms", "role" => role.to_string()).record(latency_ms);
}

/// 记录分块写盘失败 (该块数据丢失)
pub fn record_write_failure(role: &str, frames: usize) {
    counter!("capture_rig_chunk_write_failures_total", "role" => role.to_string()).increment(1);
    counter!("capture_rig_frames_lost_total", "role" => role.to_string())
        .increment(frames as u64);
}

/// 记录采集单元终止原因
pub fn record_unit_terminated(role: &str, reason: &str) {
    counter!(
        "capture_rig_units_terminated_total",
        "role" => role.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录启动信号释放时已就绪的单元数
pub fn record_barrier_release(arrived: usize, expected: usize) {
    gauge!("capture_rig_barrier_arrivals").set(arrived as f64);
    gauge!("capture_rig_barrier_expected").set(expected as f64);
}

/// 记录会话阶段 (按状态机顺序编号)
pub fn record_session_phase(ordinal: u8) {
    gauge!("capture_rig_session_phase").set(ordinal as f64);
}

/// 单元写盘统计
///
/// 在采集线程内聚合，退出时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FlushStats {
    /// 写盘耗时 (毫秒)
    pub latency_ms: RunningStats,

    /// 每块帧数
    pub frames_per_chunk: RunningStats,
}

impl FlushStats {
    /// 记录一次成功写盘
    pub fn push(&mut self, latency_ms: f64, frames: usize) {
        self.latency_ms.push(latency_ms);
        self.frames_per_chunk.push(frames as f64);
    }
}

impl std::fmt::Display for FlushStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "latency_ms: {}; frames/chunk: {}",
            StatsSummary::from(&self.latency_ms),
            StatsSummary::from(&self.frames_per_chunk)
        )
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
