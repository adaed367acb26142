//! 客户端错误类型

use rover_driver::DriverError;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 已释放（`release()` 之后或链路致命错误之后的任何操作）
    #[error("Robot has been released")]
    Released,

    /// 配置文件解析错误
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// 文件读写错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 客户端 Result 类型别名
pub type Result<T> = std::result::Result<T, ClientError>;
