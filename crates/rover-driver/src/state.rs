//! 共享状态结构定义
//!
//! Transport、Watcher 与调用方线程通过同一个 `Arc<RoverContext>` 交换数据。
//! 按字段分组加锁：
//! - 遥测：`ArcSwap`，无锁读取，整帧原子提交
//! - 指令槽位 + 确认计数：一把 `Mutex`（提交临界区）
//! - 修正窗口：`RwLock`
//! - Watcher 状态、测距仪朝向：原子变量
//! - 同步信号：见 [`Signals`]

use crate::metrics::TransportMetrics;
use crate::signal::Signals;
use crate::status::{AtomicOrientation, AtomicWatcherStatus};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use rover_protocol::{
    LEFT_RANGE_SCALE, SLOT_HAND_ANGLE, SLOT_LEFT_RANGE, SLOT_PRIMARY_RANGE, TELEMETRY_LEN,
    TelemetryFrame,
};
use std::sync::Arc;
use std::time::Instant;

/// 遥测快照
///
/// 唯一写入者：Transport。每次提交整体替换，读者看到的总是某一帧的完整结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// 遥测向量（7 个非负整数，槽位含义见 `rover_protocol::constants`）
    pub values: [u32; TELEMETRY_LEN],
    /// 提交序号（每次提交加一，初始为 0）
    pub sequence: u64,
    /// 提交时刻（从未提交过时为 None）
    pub updated_at: Option<Instant>,
}

impl TelemetrySnapshot {
    /// 主测距仪读数（含义取决于当前朝向）
    pub fn primary_range(&self) -> u32 {
        self.values[SLOT_PRIMARY_RANGE]
    }

    /// 左测距仪读数（已换算，原始值单位为 0.1）
    pub fn left_range(&self) -> f64 {
        f64::from(self.values[SLOT_LEFT_RANGE]) / LEFT_RANGE_SCALE
    }

    /// 机械手角度（度）
    pub fn hand_angle(&self) -> u32 {
        self.values[SLOT_HAND_ANGLE]
    }

    /// 是否收到过至少一帧遥测
    pub fn is_fresh(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// 待发送指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingCommand {
    /// 线路文本（如 `F1000`）
    pub text: String,
    /// 需要的确认数
    ///
    /// - `Some(n)`: 参与确认握手，Transport 发送时把 `n` 快照为当前计数
    /// - `None`: 不参与握手（速度修正、回显不一致时的重发）
    pub confirmations: Option<u32>,
}

impl OutstandingCommand {
    pub fn tracked(text: impl Into<String>, confirmations: u32) -> Self {
        Self {
            text: text.into(),
            confirmations: Some(confirmations),
        }
    }

    pub fn untracked(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confirmations: None,
        }
    }
}

/// 指令寄存器（槽位 + 确认计数，由同一把锁保护）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegister {
    /// 最多一条待发送指令；发送前被新提交覆盖
    pub outstanding: Option<OutstandingCommand>,
    /// 提交方设置的确认数（归零后 Transport 重置为 1）
    pub required_confirmations: u32,
}

impl Default for CommandRegister {
    fn default() -> Self {
        Self {
            outstanding: None,
            required_confirmations: 1,
        }
    }
}

/// 修正窗口
///
/// 由 Facade 在需要沿墙修正的前进指令前后设置与清除。
/// `min`/`max` 全为 0 表示禁用。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionWindow {
    pub min: i32,
    pub max: i32,
    /// 期望的左侧距墙距离
    pub target_distance: f64,
    /// 被修正的指令文本（仅用于日志）
    pub command: String,
}

impl CorrectionWindow {
    pub fn new(min: i32, max: i32, target_distance: f64, command: impl Into<String>) -> Self {
        Self {
            min,
            max,
            target_distance,
            command: command.into(),
        }
    }

    /// 禁用状态的窗口
    pub fn disabled() -> Self {
        Self::default()
    }

    /// 窗口是否启用
    pub fn enabled(&self) -> bool {
        self.min != 0 || self.max != 0
    }
}

/// 共享上下文
///
/// # Example
///
/// ```
/// use rover_driver::RoverContext;
///
/// let ctx = RoverContext::new();
/// let telemetry = ctx.telemetry();
/// assert_eq!(telemetry.sequence, 0);
/// assert!(!ctx.correction.read().enabled());
/// ```
#[derive(Debug)]
pub struct RoverContext {
    /// 遥测（ArcSwap，无锁读取）
    pub telemetry: ArcSwap<TelemetrySnapshot>,
    /// 指令槽位 + 确认计数
    pub command: Mutex<CommandRegister>,
    /// 修正窗口
    pub correction: RwLock<CorrectionWindow>,
    /// Watcher 状态
    pub watcher_status: AtomicWatcherStatus,
    /// 测距仪朝向
    pub orientation: AtomicOrientation,
    /// 同步信号
    pub signals: Signals,
    /// Transport 指标
    pub metrics: TransportMetrics,
}

impl RoverContext {
    pub fn new() -> Self {
        Self {
            telemetry: ArcSwap::from_pointee(TelemetrySnapshot::default()),
            command: Mutex::new(CommandRegister::default()),
            correction: RwLock::new(CorrectionWindow::disabled()),
            watcher_status: AtomicWatcherStatus::default(),
            orientation: AtomicOrientation::default(),
            signals: Signals::new(),
            metrics: TransportMetrics::new(),
        }
    }

    /// 读取当前遥测快照（无锁）
    pub fn telemetry(&self) -> Arc<TelemetrySnapshot> {
        self.telemetry.load_full()
    }

    /// 提交一帧遥测，返回新的序号
    ///
    /// 只允许 Transport 线程调用（单写者，因此 load + store 不会丢更新）。
    pub fn commit_telemetry(&self, frame: &TelemetryFrame) -> u64 {
        let previous = self.telemetry.load();
        let next = TelemetrySnapshot {
            values: frame.apply_to(&previous.values),
            sequence: previous.sequence + 1,
            updated_at: Some(Instant::now()),
        };
        let sequence = next.sequence;
        self.telemetry.store(Arc::new(next));
        sequence
    }
}

impl Default for RoverContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = TelemetrySnapshot {
            values: [10, 550, 0, 0, 0, 90, 0],
            sequence: 1,
            updated_at: Some(Instant::now()),
        };
        assert_eq!(snapshot.primary_range(), 10);
        assert!((snapshot.left_range() - 55.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.hand_angle(), 90);
        assert!(snapshot.is_fresh());
        assert!(!TelemetrySnapshot::default().is_fresh());
    }

    #[test]
    fn test_command_register_default() {
        let register = CommandRegister::default();
        assert!(register.outstanding.is_none());
        assert_eq!(register.required_confirmations, 1);
    }

    #[test]
    fn test_correction_window_enabled() {
        assert!(!CorrectionWindow::disabled().enabled());
        assert!(CorrectionWindow::new(-5, 5, 16.0, "F1000").enabled());
        assert!(CorrectionWindow::new(0, 3, 16.0, "F1000").enabled());
    }

    #[test]
    fn test_commit_telemetry_partial_frame_keeps_previous() {
        let ctx = RoverContext::new();
        let full = TelemetryFrame::parse("1 2 3 4 5 6 7").unwrap();
        assert_eq!(ctx.commit_telemetry(&full), 1);

        // 只有 3 个 token：后面的槽位保留旧值
        let partial = TelemetryFrame::parse("9 9 9").unwrap();
        assert_eq!(ctx.commit_telemetry(&partial), 2);

        let snapshot = ctx.telemetry();
        assert_eq!(snapshot.values, [9, 9, 9, 4, 5, 6, 7]);
        assert_eq!(snapshot.sequence, 2);
    }

    #[test]
    fn test_commit_telemetry_ignores_extra_tokens() {
        let ctx = RoverContext::new();
        let frame = TelemetryFrame::parse("1 2 3 4 5 6 7 8 9").unwrap();
        ctx.commit_telemetry(&frame);
        assert_eq!(ctx.telemetry().values, [1, 2, 3, 4, 5, 6, 7]);
    }
}
