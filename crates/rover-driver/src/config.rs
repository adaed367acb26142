//! 驱动层配置
//!
//! 全部字段带默认值（`#[serde(default)]`），TOML 中可以只写需要覆盖的部分：
//!
//! ```toml
//! [serial]
//! path = "/dev/ttyUSB0"
//!
//! [watcher]
//! proportional_gain = 200.0
//! ```

use crate::error::DriverError;
use crate::pipeline::{PipelineConfig, StartupConfig};
use crate::watcher::WatcherConfig;
use rover_protocol::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// 设备路径（如 `/dev/ttyUSB0`、`COM3`）
    pub path: String,
    /// 波特率
    pub baud_rate: u32,
    /// 打开串口时的初始读写超时（毫秒）
    ///
    /// 连接建立后 Transport 会改用 `pipeline.read_timeout_ms`。
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 5000,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// 驱动层完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub serial: SerialConfig,
    pub startup: StartupConfig,
    pub watcher: WatcherConfig,
    pub pipeline: PipelineConfig,
}

impl DriverConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        toml::from_str(text).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// 校验配置
    ///
    /// # 错误
    /// - `DriverError::Config`: 设备路径为空，或 [`validate_runtime`](Self::validate_runtime) 失败
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.serial.path.trim().is_empty() {
            return Err(DriverError::Config("serial.path is empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(DriverError::Config("serial.baud_rate must be positive".to_string()));
        }
        self.validate_runtime()
    }

    /// 校验与设备无关的运行参数（缓冲区容量、连接次数）
    pub fn validate_runtime(&self) -> Result<(), DriverError> {
        if self.watcher.buffer_size == 0 {
            return Err(DriverError::Config("watcher.buffer_size must be positive".to_string()));
        }
        if self.startup.connect_attempts == 0 {
            return Err(DriverError::Config(
                "startup.connect_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
