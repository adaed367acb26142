//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use rover_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{
    MotionConfig, MoveReport, NullOverlay, Overlay, Robot, RobotConfig, TelemetryView,
};

// 驱动层（高级用户使用）
pub use crate::driver::{
    CorrectionWindow, RangefinderOrientation, Rover, RoverBuilder, SubmitOptions, SubmitOutcome,
    TelemetrySnapshot, WatcherStatus,
};

// 协议层
pub use crate::protocol::{Command, GripperAction};

// 错误类型
pub use crate::client::ClientError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::serial::SerialError;
