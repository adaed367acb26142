//! 指令门面（`Robot`）
//!
//! 把线路指令包装为带超时与重试策略的同步操作。每个操作都在调用线程上
//! 阻塞到请求的阶段（回显或完成）；Transport 与 Watcher 在后台线程运行。
//!
//! # Example
//!
//! ```rust,no_run
//! use rover_client::{Robot, RobotConfig};
//!
//! # fn main() -> rover_client::Result<()> {
//! let robot = Robot::connect(RobotConfig::for_device("/dev/ttyAMA0"))?;
//!
//! robot.set_hand_angle(117)?;
//! robot.go(100, true, None)?;
//! robot.rotate(90, true)?;
//! robot.release()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{MotionConfig, RobotConfig};
use crate::error::{ClientError, Result};
use crate::overlay::TelemetryView;
use rover_driver::{
    CorrectionWindow, RangefinderOrientation, Rover, RoverBuilder, Signal, SubmitOptions,
    SubmitOutcome, TelemetrySnapshot, WaitOutcome,
};
use rover_protocol::{Command, GripperAction};
use rover_serial::Connector;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次 `go()` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// 实际下发的移动指令条数（驶向墙时包含重发）
    pub attempts: u32,
    /// 最后一条移动指令的提交结果
    pub outcome: SubmitOutcome,
}

/// 修正窗口守卫：离开作用域时清除窗口（包括提前返回）
struct CorrectionGuard<'a> {
    rover: &'a Rover,
}

impl<'a> CorrectionGuard<'a> {
    fn install(rover: &'a Rover, window: CorrectionWindow) -> Self {
        rover.set_correction_window(window);
        Self { rover }
    }
}

impl Drop for CorrectionGuard<'_> {
    fn drop(&mut self) {
        self.rover.clear_correction_window();
    }
}

/// 小车指令门面
pub struct Robot {
    rover: Rover,
    motion: MotionConfig,
    released: AtomicBool,
}

impl Robot {
    /// 打开串口并启动后台线程
    ///
    /// # 错误
    /// - `ClientError::Driver`: 配置无效、连接重试耗尽或线程创建失败
    pub fn connect(config: RobotConfig) -> Result<Self> {
        let rover = RoverBuilder::from_config(config.driver).build()?;
        Ok(Self::from_rover(rover, config.motion))
    }

    /// 使用自定义连接工厂启动（测试时传入 Mock）
    pub fn connect_with<C>(config: RobotConfig, connector: C) -> Result<Self>
    where
        C: Connector + Send + 'static,
    {
        let rover = RoverBuilder::from_config(config.driver).build_with_connector(connector)?;
        Ok(Self::from_rover(rover, config.motion))
    }

    /// 包装已启动的驱动
    pub fn from_rover(rover: Rover, motion: MotionConfig) -> Self {
        Self {
            rover,
            motion,
            released: AtomicBool::new(false),
        }
    }

    /// 底层驱动（高级用法：Watcher 状态、原始提交、指标）
    pub fn rover(&self) -> &Rover {
        &self.rover
    }

    pub fn motion_config(&self) -> &MotionConfig {
        &self.motion
    }

    /// 只读遥测句柄（供显示端使用）
    pub fn telemetry_view(&self) -> TelemetryView {
        TelemetryView::new(self.rover.context().clone())
    }

    /// 是否已释放
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire) || self.rover.is_releasing()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_released() {
            Err(ClientError::Released)
        } else {
            Ok(())
        }
    }

    /// 提交并把 `Released` 映射为错误，超时只记录日志
    fn submit(&self, command: &Command, options: SubmitOptions) -> Result<SubmitOutcome> {
        match self.rover.submit(command, options) {
            SubmitOutcome::Released => Err(ClientError::Released),
            SubmitOutcome::TimedOut => {
                warn!("Command {} timed out waiting for completion", command);
                Ok(SubmitOutcome::TimedOut)
            },
            outcome => Ok(outcome),
        }
    }

    fn submit_sent(&self, command: &Command) -> Result<SubmitOutcome> {
        self.submit(command, SubmitOptions::sent())
    }

    fn submit_completed(&self, command: &Command, timeout: Duration) -> Result<SubmitOutcome> {
        self.submit(command, SubmitOptions::completed(timeout))
    }

    // ==================== 遥测 ====================

    /// 当前遥测快照
    pub fn telemetry(&self) -> Arc<TelemetrySnapshot> {
        self.rover.telemetry()
    }

    /// 前方距离（测距仪朝前时有效）
    pub fn forward_distance(&self) -> Option<u32> {
        (self.rover.orientation() == RangefinderOrientation::Forward)
            .then(|| self.telemetry().primary_range())
    }

    /// 右侧距离（测距仪朝右时有效）
    pub fn right_distance(&self) -> Option<u32> {
        (self.rover.orientation() == RangefinderOrientation::Right)
            .then(|| self.telemetry().primary_range())
    }

    /// 左侧距离
    pub fn left_distance(&self) -> f64 {
        self.telemetry().left_range()
    }

    /// 机械手角度（度）
    pub fn hand_angle(&self) -> u32 {
        self.telemetry().hand_angle()
    }

    pub fn rangefinder_orientation(&self) -> RangefinderOrientation {
        self.rover.orientation()
    }

    // ==================== 机动 ====================

    /// 前进
    ///
    /// # 参数
    /// - `distance`: 前进距离（`wall_limit` 为 `None` 时使用）
    /// - `correct`: 是否启用沿墙修正
    /// - `wall_limit`: 驶向墙并停在该距离处；剩余距离超过 `wall_stop_margin` 时重发，
    ///   最多重发 `max_wall_retries` 次
    ///
    /// # 错误
    /// - `ClientError::Released`: 已释放，或等待期间收到关闭请求
    pub fn go(&self, distance: i32, correct: bool, wall_limit: Option<i32>) -> Result<MoveReport> {
        self.ensure_active()?;

        let command = match wall_limit {
            None => Command::forward(distance),
            Some(limit) => {
                self.switch_rangefinder(RangefinderOrientation::Forward, false)?;
                Command::drive_to_wall(limit)
            },
        };
        info!(
            "Going {}{}",
            match wall_limit {
                None => format!("{distance}"),
                Some(limit) => format!("to wall {limit}"),
            },
            if correct { " (correction)" } else { "" }
        );

        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = self.run_move(&command, correct)?;

            let Some(limit) = wall_limit else {
                return Ok(MoveReport { attempts, outcome });
            };
            let remaining = self
                .forward_distance()
                .map(|forward| i64::from(forward) - i64::from(limit));
            match remaining {
                Some(remaining) if remaining > i64::from(self.motion.wall_stop_margin) => {
                    if attempts > self.motion.max_wall_retries {
                        warn!(
                            "Wall still {} away after {} attempts, giving up",
                            remaining, attempts
                        );
                        return Ok(MoveReport { attempts, outcome });
                    }
                    debug!("Wall still {} away, repeating {}", remaining, command);
                },
                _ => return Ok(MoveReport { attempts, outcome }),
            }
        }
    }

    /// 单次移动：修正窗口 → 固定修正 → 指令 → Blocking 期间继续等待
    fn run_move(&self, command: &Command, correct: bool) -> Result<SubmitOutcome> {
        let _guard = correct.then(|| {
            CorrectionGuard::install(
                &self.rover,
                CorrectionWindow::new(
                    -self.motion.correction_tolerance,
                    self.motion.correction_tolerance,
                    self.motion.follow_distance,
                    command.to_string(),
                ),
            )
        });

        if self.motion.permanent_correction != 0 {
            let correction = Command::SpeedCorrection(self.motion.permanent_correction);
            if self.rover.submit_untracked(&correction, true) == SubmitOutcome::Released {
                return Err(ClientError::Released);
            }
        }

        let outcome = self.submit_completed(command, self.motion.completion_timeout())?;

        while self.rover.watcher_status().is_blocking() {
            match self
                .rover
                .signals()
                .wait(Signal::Completed, Some(self.motion.blocking_poll()))
            {
                WaitOutcome::Released => return Err(ClientError::Released),
                WaitOutcome::Signaled => {
                    if self.rover.pause(self.motion.blocking_poll()) {
                        return Err(ClientError::Released);
                    }
                },
                WaitOutcome::TimedOut => {},
            }
        }

        Ok(outcome)
    }

    /// 原地旋转
    ///
    /// `wait = true` 时等待完成（小角度 1 秒，否则 20 秒超时），否则只等待回显。
    pub fn rotate(&self, degrees: i32, wait: bool) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        info!("Rotating: {}", degrees);
        let command = Command::Rotate { degrees };
        if wait {
            self.submit_completed(&command, self.motion.rotation_timeout(degrees))
        } else {
            self.submit_sent(&command)
        }
    }

    /// 设置机械手角度
    ///
    /// 角度与当前相同时固件不回复 `OK`，此时只等待回显。
    pub fn set_hand_angle(&self, degrees: i32) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.set_hand_angle_inner(degrees)
    }

    fn set_hand_angle_inner(&self, degrees: i32) -> Result<SubmitOutcome> {
        let command = Command::HandAngle { degrees };
        if i64::from(degrees) != i64::from(self.hand_angle()) {
            self.submit_completed(&command, self.motion.completion_timeout())
        } else {
            self.submit_sent(&command)
        }
    }

    /// 转动测距仪
    ///
    /// 朝向未变且未强制时不下发。该指令没有完成确认，下发后等待
    /// `rangefinder_settle_ms`（可被关闭请求打断）。
    pub fn switch_rangefinder(&self, direction: RangefinderOrientation, force: bool) -> Result<()> {
        self.ensure_active()?;
        if !force && self.rover.orientation() == direction {
            return Ok(());
        }

        let degrees = match direction {
            RangefinderOrientation::Forward => self.motion.rangefinder_forward_angle,
            RangefinderOrientation::Right => self.motion.rangefinder_right_angle,
        };
        self.rover.set_orientation(direction);
        self.submit_sent(&Command::RangefinderAngle { degrees })?;

        if self.rover.pause(self.motion.rangefinder_settle()) {
            return Err(ClientError::Released);
        }
        Ok(())
    }

    // ==================== 执行器 ====================

    pub fn close_grabber(&self) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_completed(
            &Command::Gripper(GripperAction::Close),
            self.motion.completion_timeout(),
        )
    }

    pub fn open_grabber(&self) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_completed(
            &Command::Gripper(GripperAction::Open),
            self.motion.completion_timeout(),
        )
    }

    pub fn set_red_led(&self, on: bool) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_sent(&Command::RedLed(on))
    }

    pub fn set_green_led(&self, on: bool) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_sent(&Command::GreenLed(on))
    }

    /// 指示灯闪烁周期（毫秒）
    pub fn set_led_period(&self, millis: u32) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_sent(&Command::LedPeriod { millis })
    }

    pub fn set_light(&self, on: bool) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_sent(&Command::Light(on))
    }

    /// 重置里程位置
    pub fn reset_position(&self) -> Result<SubmitOutcome> {
        self.ensure_active()?;
        self.submit_sent(&Command::ResetPosition)
    }

    // ==================== 生命周期 ====================

    /// 释放
    ///
    /// 第一次调用：机械手回到中立角度、重置位置、置位 *releasing*；
    /// 之后的调用直接返回。链路已断开时跳过指令，只置位 *releasing*。
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("Releasing robot");

        if !self.rover.is_releasing() {
            match self
                .set_hand_angle_inner(self.motion.neutral_hand_angle)
                .and_then(|_| self.submit_sent(&Command::ResetPosition))
            {
                Ok(_) => {},
                Err(e) => warn!("Release sequence interrupted: {}", e),
            }
        }

        self.rover.request_release();
        Ok(())
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            debug!("Robot dropped without release()");
        }
    }
}
