//! 驱动层错误类型定义

use rover_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口适配层错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 启动阶段连接重试耗尽
    #[error("Failed to connect after {attempts} attempts")]
    ConnectionFailure { attempts: u32 },

    /// 已请求关闭
    #[error("Rover is releasing")]
    Released,

    /// 配置错误
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use rover_serial::SerialError;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::from(SerialError::Closed);
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Connection closed"), "Serial error message: {}", msg);

        let msg = DriverError::ConnectionFailure { attempts: 3 }.to_string();
        assert!(msg.contains("3 attempts"), "ConnectionFailure message: {}", msg);

        assert_eq!(DriverError::Released.to_string(), "Rover is releasing");

        let msg = DriverError::IoThread("spawn failed".to_string()).to_string();
        assert!(msg.contains("spawn failed"));
    }
}
