//! 沿墙修正（Watcher）
//!
//! 每收到一帧遥测运行一次的离散时间 PD 控制器：
//! 左测距仪读数连续低于阈值（去抖）后认为"找到墙"，之后把
//! `目标距离 − 实测距离` 放入定长缓冲区；缓冲区满后按
//! `latest × kp + (latest − oldest) × kd` 计算速度修正量，
//! 与上次不同时以 `V<correction>` 下发。
//!
//! 控制律本身（[`WallFollower`]）是纯函数式状态机，不依赖线程和时钟，
//! 线程循环（[`watcher_loop`]）只负责等待遥测和下发指令。

use crate::command::CommandChannel;
use crate::signal::{Signal, WaitOutcome};
use crate::state::{CorrectionWindow, RoverContext, TelemetrySnapshot};
use crate::status::WatcherStatus;
use rover_protocol::Command;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Watcher 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 比例系数
    pub proportional_gain: f64,
    /// 微分系数（作用于缓冲区首尾误差之差）
    pub derivative_gain: f64,
    /// 两次采样之间的最小间隔（毫秒）
    pub correction_interval_ms: u64,
    /// 误差缓冲区容量
    pub buffer_size: usize,
    /// 左侧距离低于该值视为墙存在
    pub wall_detect_threshold: f64,
    /// 连续超过该次数才认为找到墙
    pub wall_detect_debounce: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            proportional_gain: 250.0,
            derivative_gain: 100.0,
            correction_interval_ms: 100,
            buffer_size: 10,
            wall_detect_threshold: 60.0,
            wall_detect_debounce: 3,
        }
    }
}

impl WatcherConfig {
    pub fn correction_interval(&self) -> Duration {
        Duration::from_millis(self.correction_interval_ms)
    }
}

/// 沿墙 PD 控制器状态
#[derive(Debug, Clone)]
pub struct WallFollower {
    config: WatcherConfig,
    errors: VecDeque<f64>,
    wall_counter: u32,
    wall_found: bool,
    last_correction: Option<Instant>,
    last_distance: Option<f64>,
    previous_correction: i32,
}

impl WallFollower {
    pub fn new(config: WatcherConfig) -> Self {
        let capacity = config.buffer_size.max(1);
        Self {
            config,
            errors: VecDeque::with_capacity(capacity + 1),
            wall_counter: 0,
            wall_found: false,
            last_correction: None,
            last_distance: None,
            previous_correction: 0,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// 是否已找到墙
    pub fn wall_found(&self) -> bool {
        self.wall_found
    }

    /// 已缓冲的误差个数
    pub fn buffered(&self) -> usize {
        self.errors.len()
    }

    /// 最近一次计算时的左侧距离
    pub fn last_distance(&self) -> Option<f64> {
        self.last_distance
    }

    /// 清空全部内部状态
    pub fn reset(&mut self) {
        self.errors.clear();
        self.wall_counter = 0;
        self.wall_found = false;
        self.last_correction = None;
        self.last_distance = None;
        self.previous_correction = 0;
    }

    /// 处理一帧遥测
    ///
    /// 返回需要下发的速度修正量；`None` 表示本帧不下发。
    ///
    /// # 参数
    /// - `now`: 本帧到达时刻
    /// - `telemetry`: 当前遥测快照
    /// - `status`: Watcher 状态（非 `Free` 时重置并返回）
    /// - `window`: 修正窗口（禁用时重置并返回；启用时提供目标距离）
    pub fn step(
        &mut self,
        now: Instant,
        telemetry: &TelemetrySnapshot,
        status: WatcherStatus,
        window: &CorrectionWindow,
    ) -> Option<i32> {
        if !(status.is_free() && window.enabled()) {
            self.reset();
            return None;
        }

        if let Some(last) = self.last_correction
            && now.saturating_duration_since(last) < self.config.correction_interval()
        {
            return None;
        }

        let distance = telemetry.left_range();
        if distance < self.config.wall_detect_threshold {
            self.wall_counter += 1;
            self.wall_found |= self.wall_counter > self.config.wall_detect_debounce;
        } else {
            self.wall_counter = 0;
        }

        if !self.wall_found {
            return None;
        }

        let capacity = self.config.buffer_size.max(1);
        self.errors.push_back(window.target_distance - distance);
        while self.errors.len() > capacity {
            self.errors.pop_front();
        }
        if self.errors.len() < capacity {
            return None;
        }

        let latest = self.errors.back().copied().unwrap_or_default();
        let oldest = self.errors.front().copied().unwrap_or_default();
        let proportional = latest * self.config.proportional_gain;
        let derivative = (latest - oldest) * self.config.derivative_gain;
        let correction = (proportional + derivative).trunc() as i32;

        let emitted = (correction != self.previous_correction).then_some(correction);
        trace!(
            "Wall follower: distance={:.1}, error={:.1}, correction={}",
            distance, latest, correction
        );

        self.previous_correction = correction;
        self.last_correction = Some(now);
        self.last_distance = Some(distance);
        emitted
    }
}

/// Watcher 线程主循环
///
/// 每次 *telemetry-updated*（等待并清除）运行一次 [`WallFollower::step`]，
/// 修正量以不参与握手的方式提交并等待回显：最多领先 Transport 一条修正。
/// 观察到 *releasing*（包括等待过程中）即退出。
pub fn watcher_loop(ctx: Arc<RoverContext>, config: WatcherConfig) {
    let channel = CommandChannel::new(ctx.clone());
    let mut follower = WallFollower::new(config);

    loop {
        match ctx.signals.wait_and_clear(Signal::TelemetryUpdated, None) {
            WaitOutcome::Signaled => {},
            WaitOutcome::Released | WaitOutcome::TimedOut => break,
        }
        if ctx.signals.is_releasing() {
            break;
        }

        let telemetry = ctx.telemetry();
        let status = ctx.watcher_status.get(Ordering::Acquire);
        let window = ctx.correction.read().clone();

        if let Some(correction) = follower.step(Instant::now(), &telemetry, status, &window) {
            debug!("Speed correction {} while running {}", correction, window.command);
            channel.submit_untracked(&Command::SpeedCorrection(correction), true);
        }
    }

    info!("Watcher loop exited");
}
