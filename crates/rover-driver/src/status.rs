//! 共享状态枚举
//!
//! 定义 Watcher 状态和测距仪朝向，以及它们的原子版本（线程间共享）。

use std::sync::atomic::{AtomicU8, Ordering};

/// Watcher 状态
///
/// # 状态说明
///
/// - **Free**: 允许沿墙修正（默认）
/// - **Suppressed**: 其他机动（旋转等）占用小车，Watcher 空转并重置内部状态
/// - **Blocking**: 同 Suppressed，且 `go()` 在状态保持 Blocking 期间继续等待完成信号
///
/// # 约定
///
/// 该字段由外部设置：启动不应被修正的机动前，调用方通过
/// `Rover::set_watcher_status()` 设为 `Suppressed`/`Blocking`，机动结束后恢复 `Free`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WatcherStatus {
    /// 允许修正（默认）
    #[default]
    Free = 0,

    /// 抑制修正
    Suppressed = 1,

    /// 抑制修正，且 `go()` 持续等待完成
    Blocking = 2,
}

impl WatcherStatus {
    /// 从 u8 转换
    ///
    /// 如果值无效，返回 Suppressed（宁可不修正）。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Free,
            1 => Self::Suppressed,
            2 => Self::Blocking,
            _ => Self::Suppressed,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否允许修正
    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    /// 是否为阻塞阶段
    pub fn is_blocking(self) -> bool {
        self == Self::Blocking
    }
}

/// Watcher 状态（原子版本）
#[derive(Debug)]
pub struct AtomicWatcherStatus {
    inner: AtomicU8,
}

impl AtomicWatcherStatus {
    pub fn new(status: WatcherStatus) -> Self {
        Self {
            inner: AtomicU8::new(status.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self, ordering: Ordering) -> WatcherStatus {
        WatcherStatus::from_u8(self.inner.load(ordering))
    }

    /// 设置状态
    pub fn set(&self, status: WatcherStatus, ordering: Ordering) {
        self.inner.store(status.as_u8(), ordering);
    }
}

impl Default for AtomicWatcherStatus {
    fn default() -> Self {
        Self::new(WatcherStatus::Free)
    }
}

/// 测距仪朝向
///
/// 小车只有一个主测距仪，由舵机在"前方"和"右侧"之间转动；
/// 遥测槽位 0 的含义取决于当前朝向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RangefinderOrientation {
    /// 朝前（默认）
    #[default]
    Forward = 0,
    /// 朝右
    Right = 1,
}

impl RangefinderOrientation {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Right,
            _ => Self::Forward,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 测距仪朝向（原子版本）
///
/// 仅由 Facade 的朝向切换操作写入，遥测访问器读取。
#[derive(Debug, Default)]
pub struct AtomicOrientation {
    inner: AtomicU8,
}

impl AtomicOrientation {
    pub fn new(orientation: RangefinderOrientation) -> Self {
        Self {
            inner: AtomicU8::new(orientation.as_u8()),
        }
    }

    pub fn get(&self) -> RangefinderOrientation {
        RangefinderOrientation::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, orientation: RangefinderOrientation) {
        self.inner.store(orientation.as_u8(), Ordering::Release);
    }
}
