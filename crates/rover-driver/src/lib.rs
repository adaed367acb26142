//! 驱动层模块
//!
//! 本模块提供小车串口链路的并发运行时，包括：
//! - Transport 线程：连接重试、逐行收取、确认握手、指令槽位排空
//! - 状态同步（ArcSwap 无锁读取遥测）
//! - 单槽位指令通道（Overwrite）与确认计数
//! - Watcher 线程：沿墙 PD 修正
//! - 五个同步信号（复合等待，关闭请求可打断任何等待）
//!
//! # 使用场景
//!
//! 适用于需要直接提交线路指令、读取原始遥测的场景。
//! 大多数用户应该使用 `rover-client` 提供的 `Robot` 接口。

mod builder;
pub mod command;
pub mod config;
mod error;
pub mod metrics;
pub mod pipeline;
mod rover;
pub mod signal;
pub mod state;
pub mod status;
pub mod watcher;

pub use builder::RoverBuilder;
pub use command::{CommandChannel, DEFAULT_COMPLETION_TIMEOUT, SubmitOptions, SubmitOutcome};
pub use config::{DriverConfig, SerialConfig};
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use pipeline::{
    LineEvent, LineProcessor, PipelineConfig, StartupConfig, connect_with_retry, transport_loop,
};
pub use rover::Rover;
pub use signal::{Signal, Signals, WaitOutcome};
pub use state::*;
pub use status::{AtomicOrientation, AtomicWatcherStatus, RangefinderOrientation, WatcherStatus};
pub use watcher::{WallFollower, WatcherConfig, watcher_loop};
