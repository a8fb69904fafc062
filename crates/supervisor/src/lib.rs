//! # Supervisor
//!
//! 会话监督器：校验配置、启动采集单元、预热、释放同步屏障、排空并汇总。
//!
//! ## 使用示例
//!
//! ```ignore
//! use supervisor::Supervisor;
//!
//! let supervisor = Supervisor::new(blueprint, Arc::new(BackendRegistry));
//! let report = supervisor.run(cancel_token).await?;
//! report.print_summary();
//! ```

mod report;
mod state;
mod supervisor;

pub use report::SessionReport;
pub use state::{SessionPhase, SessionState, UnitLiveness};
pub use supervisor::Supervisor;
