//! # Rover Serial Adapter Layer
//!
//! 串口硬件抽象层：把字节流包装为"按行读取、按原始字节写入"的统一接口。
//!
//! - [`LineAdapter`]: 已建立连接的行适配器（Transport 线程独占）
//! - [`Connector`]: 建立连接的工厂（启动阶段可重试）
//! - [`SerialPortAdapter`]: 基于 `serialport` 的真实实现
//! - `mock`: 脚本化的 Mock 适配器（feature `mock`）

use std::time::Duration;
use thiserror::Error;

pub mod serial;

pub use serial::{SerialPortAdapter, SerialPortConnector};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{AutoReply, MockConnector, MockHandle, MockLineAdapter};

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),
    #[error("Connection closed")]
    Closed,
    #[error("Read timeout")]
    Timeout,
}

impl SerialError {
    /// 是否为致命错误（连接已不可用，Transport 应退出）
    pub fn is_fatal(&self) -> bool {
        match self {
            SerialError::Timeout => false,
            SerialError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            SerialError::Port(_) | SerialError::Closed => true,
        }
    }
}

/// 行适配器
///
/// 由 Transport 线程独占使用。
pub trait LineAdapter {
    /// 读取一行（不含 `\n`/`\r\n`）
    ///
    /// 读超时时间内没有完整行时返回 `Ok(None)`，未读完的半行保留到下次调用。
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SerialError>;

    /// 原样写出字节（不追加行结束符）
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError>;

    /// 设置读超时
    fn set_read_timeout(&mut self, _timeout: Duration) {}
}

/// 连接工厂
///
/// Transport 在启动阶段调用 `connect()`，失败后按退避策略重试。
pub trait Connector {
    type Adapter: LineAdapter + Send + 'static;

    /// 建立一次连接
    fn connect(&mut self) -> Result<Self::Adapter, SerialError>;

    /// 设备描述（用于日志）
    fn describe(&self) -> String {
        "unknown".to_string()
    }
}
