//! Builder 模式实现
//!
//! 提供链式构造 `Rover` 实例的便捷方式。

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::pipeline::{PipelineConfig, StartupConfig, transport_loop};
use crate::rover::Rover;
use crate::signal::Signal;
use crate::state::RoverContext;
use crate::watcher::{WatcherConfig, watcher_loop};
use rover_serial::{Connector, SerialPortConnector};
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Rover Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use rover_driver::{RoverBuilder, StartupConfig};
///
/// // 使用默认配置
/// let rover = RoverBuilder::new("/dev/ttyUSB0").build().unwrap();
///
/// // 自定义连接重试
/// let rover = RoverBuilder::new("/dev/ttyUSB0")
///     .baud_rate(115_200)
///     .startup_config(StartupConfig {
///         connect_attempts: 5,
///         connect_backoff_ms: 1000,
///     })
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RoverBuilder {
    config: DriverConfig,
}

impl RoverBuilder {
    /// 创建新的 Builder
    ///
    /// # 参数
    /// - `path`: 串口设备路径
    pub fn new(path: impl Into<String>) -> Self {
        let mut config = DriverConfig::default();
        config.serial.path = path.into();
        Self { config }
    }

    /// 从完整配置创建
    pub fn from_config(config: DriverConfig) -> Self {
        Self { config }
    }

    /// 设置波特率（可选，默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.serial.baud_rate = baud_rate;
        self
    }

    /// 设置连接重试配置（可选）
    pub fn startup_config(mut self, config: StartupConfig) -> Self {
        self.config.startup = config;
        self
    }

    /// 设置 Watcher 配置（可选）
    pub fn watcher_config(mut self, config: WatcherConfig) -> Self {
        self.config.watcher = config;
        self
    }

    /// 设置 Pipeline 配置（可选）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// 当前配置
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 打开串口并启动 Transport 与 Watcher
    ///
    /// # 错误
    /// - `DriverError::Config`: 配置无效
    /// - `DriverError::ConnectionFailure`: 连接重试耗尽
    /// - `DriverError::IoThread`: 线程创建失败或 Transport 在启动阶段异常退出
    pub fn build(self) -> Result<Rover, DriverError> {
        self.config.validate()?;
        let connector = SerialPortConnector::new(
            self.config.serial.path.clone(),
            self.config.serial.baud_rate,
            self.config.serial.read_timeout(),
        );
        self.build_with_connector(connector)
    }

    /// 使用自定义连接工厂启动（测试时传入 Mock）
    ///
    /// 阻塞直到 Transport 报告启动结果：启动失败时 Transport 不会触发 *ready*，
    /// 这里通过启动通道拿到错误，不会无限等待。
    pub fn build_with_connector<C>(self, connector: C) -> Result<Rover, DriverError>
    where
        C: Connector + Send + 'static,
    {
        self.config.validate_runtime()?;

        let device = connector.describe();
        let ctx = Arc::new(RoverContext::new());
        let (startup_tx, startup_rx) = crossbeam_channel::bounded(1);

        let transport_ctx = ctx.clone();
        let startup = self.config.startup.clone();
        let pipeline = self.config.pipeline.clone();
        let transport_thread = thread::Builder::new()
            .name("rover-transport".to_string())
            .spawn(move || transport_loop(connector, transport_ctx, startup, pipeline, startup_tx))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        match startup_rx.recv() {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                let _ = transport_thread.join();
                return Err(e);
            },
            Err(_) => {
                let _ = transport_thread.join();
                return Err(DriverError::IoThread(
                    "transport thread exited during startup".to_string(),
                ));
            },
        }

        let watcher_ctx = ctx.clone();
        let watcher_config = self.config.watcher.clone();
        let watcher_thread = match thread::Builder::new()
            .name("rover-watcher".to_string())
            .spawn(move || watcher_loop(watcher_ctx, watcher_config))
        {
            Ok(handle) => handle,
            Err(e) => {
                // Transport 已在运行，必须先让它退出
                ctx.signals.set(Signal::Releasing);
                let _ = transport_thread.join();
                return Err(DriverError::IoThread(e.to_string()));
            },
        };

        info!("Rover ready on {}", device);
        Ok(Rover::new(ctx, transport_thread, watcher_thread, device))
    }
}
