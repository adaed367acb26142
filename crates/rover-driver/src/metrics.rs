//! Transport 指标模块
//!
//! 提供零开销的原子计数器，用于监控串口链路的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// Transport 实时指标
///
/// # 使用示例
///
/// ```rust
/// use rover_driver::TransportMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = TransportMetrics::new();
/// metrics.lines_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.lines_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// 读到的总行数（含被丢弃的行）
    pub lines_total: AtomicU64,

    /// `OK` 确认行数
    pub acks: AtomicU64,

    /// 与待确认指令一致的回显行数
    pub echo_confirmed: AtomicU64,

    /// 与待确认指令不一致的回显行数（会触发重发）
    pub echo_mismatches: AtomicU64,

    /// 成功提交的遥测帧数
    pub telemetry_commits: AtomicU64,

    /// 被丢弃的畸形行数（非 UTF-8、非法 token、空行）
    pub malformed_lines: AtomicU64,

    /// 写出的指令数
    pub commands_sent: AtomicU64,

    /// 指令槽位被覆盖次数
    ///
    /// 如果这个值快速增长，说明提交速度超过了 Transport 的发送节奏。
    pub slot_overwrites: AtomicU64,

    /// 写出失败次数
    pub write_errors: AtomicU64,

    /// 读超时次数（正常现象，无数据时会超时）
    pub read_timeouts: AtomicU64,
}

impl TransportMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_total: self.lines_total.load(Ordering::Relaxed),
            acks: self.acks.load(Ordering::Relaxed),
            echo_confirmed: self.echo_confirmed.load(Ordering::Relaxed),
            echo_mismatches: self.echo_mismatches.load(Ordering::Relaxed),
            telemetry_commits: self.telemetry_commits.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            slot_overwrites: self.slot_overwrites.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_total: u64,
    pub acks: u64,
    pub echo_confirmed: u64,
    pub echo_mismatches: u64,
    pub telemetry_commits: u64,
    pub malformed_lines: u64,
    pub commands_sent: u64,
    pub slot_overwrites: u64,
    pub write_errors: u64,
    pub read_timeouts: u64,
}

impl MetricsSnapshot {
    /// 畸形行占比（0.0 - 1.0）
    pub fn malformed_ratio(&self) -> f64 {
        if self.lines_total == 0 {
            0.0
        } else {
            self.malformed_lines as f64 / self.lines_total as f64
        }
    }
}
