//! 命令实现
//!
//! 所有命令共用同一个会话：连接 → 执行 → `release()`。
//! 执行失败时仍然释放，再返回原始错误。

mod monitor;

use crate::Commands;
use anyhow::{Context, Result};
use clap::ValueEnum;
use rover_sdk::client::{Robot, RobotConfig};
use rover_sdk::driver::{RangefinderOrientation, SubmitOutcome};
use tracing::{info, warn};

/// 开关参数
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchArg {
    On,
    Off,
}

impl SwitchArg {
    pub fn is_on(self) -> bool {
        self == SwitchArg::On
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabberArg {
    Open,
    Close,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedArg {
    Red,
    Green,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangefinderArg {
    Forward,
    Right,
}

impl From<RangefinderArg> for RangefinderOrientation {
    fn from(arg: RangefinderArg) -> Self {
        match arg {
            RangefinderArg::Forward => RangefinderOrientation::Forward,
            RangefinderArg::Right => RangefinderOrientation::Right,
        }
    }
}

/// 连接小车并执行一条命令
pub fn run(config: RobotConfig, command: Commands) -> Result<()> {
    let device = config.driver.serial.path.clone();
    println!("🔌 连接到小车 ({})...", device);
    let robot = Robot::connect(config).with_context(|| format!("连接 {} 失败", device))?;
    println!("✅ 已连接");

    let result = execute(&robot, command);

    if let Err(e) = robot.release() {
        warn!("Release failed: {}", e);
    }
    result
}

/// 在已连接的小车上执行命令（不负责释放）
pub fn execute(robot: &Robot, command: Commands) -> Result<()> {
    match command {
        Commands::Move {
            distance,
            correct,
            wall,
        } => {
            let report = robot.go(distance, correct, wall)?;
            info!("Move finished after {} attempt(s)", report.attempts);
            report_outcome("move", report.outcome);
        },
        Commands::Rotate { degrees } => {
            let outcome = robot.rotate(degrees, true)?;
            report_outcome("rotate", outcome);
        },
        Commands::Hand { degrees } => {
            let outcome = robot.set_hand_angle(degrees)?;
            report_outcome("hand", outcome);
        },
        Commands::Grabber { action } => {
            let outcome = match action {
                GrabberArg::Open => robot.open_grabber()?,
                GrabberArg::Close => robot.close_grabber()?,
            };
            report_outcome("grabber", outcome);
        },
        Commands::Rangefinder { direction, force } => {
            robot.switch_rangefinder(direction.into(), force)?;
            println!("✅ 测距仪朝向: {:?}", robot.rangefinder_orientation());
        },
        Commands::Led { color, state } => {
            let outcome = match color {
                LedArg::Red => robot.set_red_led(state.is_on())?,
                LedArg::Green => robot.set_green_led(state.is_on())?,
            };
            report_outcome("led", outcome);
        },
        Commands::LedPeriod { millis } => {
            let outcome = robot.set_led_period(millis)?;
            report_outcome("led-period", outcome);
        },
        Commands::Light { state } => {
            let outcome = robot.set_light(state.is_on())?;
            report_outcome("light", outcome);
        },
        Commands::Reset => {
            let outcome = robot.reset_position()?;
            report_outcome("reset", outcome);
        },
        Commands::Monitor { hz } => monitor::run(robot, hz)?,
    }
    Ok(())
}

fn report_outcome(name: &str, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::TimedOut => println!("⚠️  {}: 等待完成超时", name),
        outcome => println!("✅ {}: {:?}", name, outcome),
    }
}
