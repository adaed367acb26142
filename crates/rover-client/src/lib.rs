//! 客户端接口模块
//!
//! 本模块提供小车的用户友好接口，包括：
//! - 指令门面 [`Robot`]：前进（可选沿墙修正、驶向墙）、旋转、机械手、夹爪、
//!   测距仪朝向、指示灯、照明、位置重置、释放
//! - 机动参数与 TOML 配置加载
//! - 显示协作接口（画面叠加层、只读遥测句柄）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。
//! 如果需要直接提交线路指令或调整 Watcher 状态，可以通过 [`Robot::rover`] 访问驱动层。

pub mod config;
mod error;
pub mod overlay;
pub mod robot;

pub use config::{MotionConfig, RobotConfig};
pub use error::{ClientError, Result};
pub use overlay::{NullOverlay, Overlay, OverlayState, SharedOverlay, TelemetryView};
pub use robot::{MoveReport, Robot};
