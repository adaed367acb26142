//! 客户端配置
//!
//! `RobotConfig` = 驱动层配置 + 机动参数，可以从一个 TOML 文件加载：
//!
//! ```toml
//! [driver.serial]
//! path = "/dev/ttyAMA0"
//!
//! [motion]
//! follow_distance = 18.0
//! permanent_correction = -20
//! ```

use crate::error::Result;
use rover_driver::DriverConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 机动参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 沿墙修正的目标左侧距离
    pub follow_distance: f64,
    /// 修正窗口半宽（窗口为 `[-tolerance, +tolerance]`）
    pub correction_tolerance: i32,
    /// 驶向墙时允许的剩余距离；超过则重发 `W` 指令
    pub wall_stop_margin: i32,
    /// 驶向墙的最大重发次数
    pub max_wall_retries: u32,
    /// 小角度旋转阈值（度）
    pub small_rotation_threshold_deg: i32,
    /// 小角度旋转的完成超时（毫秒）
    pub small_rotation_timeout_ms: u64,
    /// 旋转完成超时（毫秒）
    pub rotation_timeout_ms: u64,
    /// 一般指令完成超时（毫秒）
    pub completion_timeout_ms: u64,
    /// 测距仪转动后的稳定时间（毫秒，该指令没有完成确认）
    pub rangefinder_settle_ms: u64,
    /// 测距仪朝前时的舵机角度
    pub rangefinder_forward_angle: i32,
    /// 测距仪朝右时的舵机角度
    pub rangefinder_right_angle: i32,
    /// 释放时机械手回到的角度
    pub neutral_hand_angle: i32,
    /// 每次前进前下发的固定速度修正（0 表示不下发）
    pub permanent_correction: i32,
    /// Watcher 处于 Blocking 时，`go()` 轮询完成信号的间隔（毫秒）
    pub blocking_poll_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            follow_distance: 16.0,
            correction_tolerance: 5,
            wall_stop_margin: 10,
            max_wall_retries: 5,
            small_rotation_threshold_deg: 10,
            small_rotation_timeout_ms: 1000,
            rotation_timeout_ms: 20_000,
            completion_timeout_ms: 20_000,
            rangefinder_settle_ms: 800,
            rangefinder_forward_angle: 110,
            rangefinder_right_angle: 10,
            neutral_hand_angle: 125,
            permanent_correction: 0,
            blocking_poll_ms: 50,
        }
    }
}

impl MotionConfig {
    /// 按角度选择旋转完成超时
    pub fn rotation_timeout(&self, degrees: i32) -> Duration {
        if degrees.unsigned_abs() < self.small_rotation_threshold_deg.unsigned_abs() {
            Duration::from_millis(self.small_rotation_timeout_ms)
        } else {
            Duration::from_millis(self.rotation_timeout_ms)
        }
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    pub fn rangefinder_settle(&self) -> Duration {
        Duration::from_millis(self.rangefinder_settle_ms)
    }

    pub fn blocking_poll(&self) -> Duration {
        Duration::from_millis(self.blocking_poll_ms.max(1))
    }
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub driver: DriverConfig,
    pub motion: MotionConfig,
}

impl RobotConfig {
    /// 只指定设备路径，其余使用默认值
    pub fn for_device(path: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.driver.serial.path = path.into();
        config
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::io::Write;

    #[test]
    fn test_motion_defaults() {
        let motion = MotionConfig::default();
        assert_eq!(motion.follow_distance, 16.0);
        assert_eq!(motion.rangefinder_forward_angle, 110);
        assert_eq!(motion.rangefinder_right_angle, 10);
        assert_eq!(motion.neutral_hand_angle, 125);
    }

    #[test]
    fn test_rotation_timeout() {
        let motion = MotionConfig::default();
        assert_eq!(motion.rotation_timeout(9), Duration::from_secs(1));
        assert_eq!(motion.rotation_timeout(-9), Duration::from_secs(1));
        assert_eq!(motion.rotation_timeout(10), Duration::from_secs(20));
        assert_eq!(motion.rotation_timeout(-90), Duration::from_secs(20));
        assert_eq!(motion.rotation_timeout(i32::MIN), Duration::from_secs(20));
    }

    #[test]
    fn test_from_toml_str() {
        let config = RobotConfig::from_toml_str(
            r#"
            [driver.serial]
            path = "/dev/ttyAMA0"

            [driver.startup]
            connect_attempts = 5

            [motion]
            permanent_correction = -20
            "#,
        )
        .unwrap();
        assert_eq!(config.driver.serial.path, "/dev/ttyAMA0");
        assert_eq!(config.driver.startup.connect_attempts, 5);
        assert_eq!(config.driver.startup.connect_backoff_ms, 2000);
        assert_eq!(config.motion.permanent_correction, -20);
        assert_eq!(config.motion.follow_distance, 16.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nfollow_distance = 20.5").unwrap();

        let config = RobotConfig::load(file.path()).unwrap();
        assert_eq!(config.motion.follow_distance, 20.5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RobotConfig::load("/nonexistent/rover.toml").unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
