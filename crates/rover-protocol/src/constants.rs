//! 协议常量定义

/// 遥测向量长度（固件固定上报 7 个槽位）
pub const TELEMETRY_LEN: usize = 7;

/// 遥测槽位：主测距仪读数（含义取决于测距仪朝向）
pub const SLOT_PRIMARY_RANGE: usize = 0;

/// 遥测槽位：左侧测距仪读数（单位：0.1）
pub const SLOT_LEFT_RANGE: usize = 1;

/// 遥测槽位：机械手角度（度）
pub const SLOT_HAND_ANGLE: usize = 5;

/// 左侧测距仪读数的缩放系数（原始值 / 10 = 距离）
pub const LEFT_RANGE_SCALE: f64 = 10.0;

/// 执行完成确认行
pub const ACK_LINE: &str = "OK";

/// 回显确认行的前缀字符
pub const ECHO_MARKER: char = '+';

/// 距离类指令的缩放系数（`F`/`W` 指令以 0.1 为单位）
pub const DISTANCE_SCALE: i32 = 10;

/// 默认串口波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
