//! Rover SDK - 串口小车 Rust SDK
//!
//! 通过串口驱动移动小车：下发运动/执行器指令、用轻量握手协议确认执行、
//! 接收周期性遥测，并在前进时运行沿墙 PD 修正。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 线路指令编码、上行行分类与遥测校验
//! - **串口层** (`serial`): 行适配器抽象，`serialport` 实现与 Mock
//! - **驱动层** (`driver`): Transport/Watcher 线程、共享状态、同步信号
//! - **客户端层** (`client`): 指令门面 `Robot`、机动参数、显示协作接口
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use rover_sdk::prelude::*;
//!
//! # fn main() -> Result<(), ClientError> {
//! rover_sdk::init_logger();
//!
//! let robot = Robot::connect(RobotConfig::for_device("/dev/ttyAMA0"))?;
//! robot.go(100, true, None)?;
//! robot.release()?;
//! # Ok(())
//! # }
//! ```

pub use rover_client as client;
pub use rover_driver as driver;
pub use rover_protocol as protocol;
pub use rover_serial as serial;

mod logging;
pub mod prelude;

pub use logging::{init_logger, init_logger_with};

// 客户端层（推荐入口）
pub use client::{ClientError, MotionConfig, MoveReport, Robot, RobotConfig};

// 驱动层常用类型
pub use driver::{DriverError, Rover, RoverBuilder, SubmitOutcome, WatcherStatus};

// 协议层
pub use protocol::{Command, ProtocolError};

// 串口层
pub use serial::SerialError;
