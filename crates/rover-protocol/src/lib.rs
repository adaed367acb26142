//! # Rover Protocol
//!
//! 小车串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义
//! - `command`: 下行指令构建（`<opcode><integer>`）
//! - `inbound`: 上行行解析（`OK` / `+<echo>` / 遥测帧）
//!
//! ## 线路格式
//!
//! 协议是面向行的 ASCII 文本：
//!
//! ```text
//! 上位机 → 固件:  F1000        （无行结束符）
//! 固件 → 上位机:  +F1000\n     （回显确认）
//! 固件 → 上位机:  OK\n         （执行完成）
//! 固件 → 上位机:  10 550 0 0 0 90 0\n  （遥测帧）
//! ```

pub mod command;
pub mod constants;
pub mod inbound;

// 重新导出常用类型
pub use command::*;
pub use constants::*;
pub use inbound::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 空行（没有任何 token）
    #[error("Empty line")]
    EmptyLine,

    /// 行内容不是合法 UTF-8
    #[error("Line is not valid UTF-8")]
    NotUtf8,

    /// 遥测帧中存在非法 token（非数字、负数或溢出）
    #[error("Invalid telemetry token #{index}: {token:?}")]
    InvalidTelemetryToken { index: usize, token: String },
}
