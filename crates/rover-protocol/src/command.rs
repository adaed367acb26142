//! 下行指令构建
//!
//! 每条指令编码为 `<opcode><integer>` 的 ASCII 文本，不带行结束符。

use crate::constants::DISTANCE_SCALE;
use std::fmt;

/// 夹爪动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GripperAction {
    /// 闭合（`H0`）
    Close,
    /// 张开（`H2`）
    Open,
}

impl GripperAction {
    fn code(self) -> u8 {
        match self {
            GripperAction::Close => 0,
            GripperAction::Open => 2,
        }
    }
}

/// 下行指令
///
/// # Example
///
/// ```
/// use rover_protocol::Command;
///
/// assert_eq!(Command::forward(100).to_string(), "F1000");
/// assert_eq!(Command::SpeedCorrection(-9750).to_string(), "V-9750");
/// assert_eq!(Command::ResetPosition.to_string(), "N");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// 前进（单位：0.1）
    Forward { tenths: i32 },
    /// 原地旋转（度）
    Rotate { degrees: i32 },
    /// 机械手角度（度）
    HandAngle { degrees: i32 },
    /// 速度修正量（由沿墙控制器产生）
    SpeedCorrection(i32),
    /// 夹爪
    Gripper(GripperAction),
    /// 红色指示灯
    RedLed(bool),
    /// 绿色指示灯
    GreenLed(bool),
    /// 指示灯闪烁周期（毫秒）
    LedPeriod { millis: u32 },
    /// 测距仪舵机角度（度）
    RangefinderAngle { degrees: i32 },
    /// 照明灯
    Light(bool),
    /// 前进直到距墙指定距离（单位：0.1）
    DriveToWall { tenths: i32 },
    /// 重置里程位置
    ResetPosition,
}

impl Command {
    /// 按距离构建前进指令（自动换算为 0.1 单位）
    pub fn forward(distance: i32) -> Self {
        Command::Forward {
            tenths: distance.saturating_mul(DISTANCE_SCALE),
        }
    }

    /// 按距墙距离构建 `W` 指令（自动换算为 0.1 单位）
    pub fn drive_to_wall(distance: i32) -> Self {
        Command::DriveToWall {
            tenths: distance.saturating_mul(DISTANCE_SCALE),
        }
    }

    /// 指令字母
    pub fn opcode(&self) -> char {
        match self {
            Command::Forward { .. } => 'F',
            Command::Rotate { .. } => 'R',
            Command::HandAngle { .. } => 'S',
            Command::SpeedCorrection(_) => 'V',
            Command::Gripper(_) => 'H',
            Command::RedLed(_) => 'G',
            Command::GreenLed(_) => 'L',
            Command::LedPeriod { .. } => 'Q',
            Command::RangefinderAngle { .. } => 'Y',
            Command::Light(_) => 'B',
            Command::DriveToWall { .. } => 'W',
            Command::ResetPosition => 'N',
        }
    }

    /// 编码为线路字节（ASCII，无行结束符）
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match self {
            Command::Forward { tenths } | Command::DriveToWall { tenths } => {
                write!(f, "{op}{tenths}")
            },
            Command::Rotate { degrees }
            | Command::HandAngle { degrees }
            | Command::RangefinderAngle { degrees } => write!(f, "{op}{degrees}"),
            Command::SpeedCorrection(value) => write!(f, "{op}{value}"),
            Command::Gripper(action) => write!(f, "{op}{}", action.code()),
            Command::RedLed(on) | Command::GreenLed(on) | Command::Light(on) => {
                write!(f, "{op}{}", u8::from(*on))
            },
            Command::LedPeriod { millis } => write!(f, "{op}{millis}"),
            Command::ResetPosition => write!(f, "{op}"),
        }
    }
}
