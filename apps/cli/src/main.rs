//! # Rover CLI
//!
//! Command-line interface for serial-link rover control.
//!
//! 每个命令独立执行：读取配置 → 连接小车 → 执行操作 → 释放。
//!
//! ```bash
//! # 前进 50 cm，开启沿墙修正
//! rover-cli --device /dev/ttyUSB0 move 50 --correct
//!
//! # 驶向墙，最多前进 200 cm
//! rover-cli move 0 --wall 200
//!
//! # 实时查看遥测
//! rover-cli monitor --hz 5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{GrabberArg, LedArg, RangefinderArg, SwitchArg};

/// Rover CLI - 小车命令行工具
#[derive(Parser, Debug)]
#[command(name = "rover-cli")]
#[command(about = "Command-line interface for serial-link rover control", long_about = None)]
#[command(version)]
pub struct Cli {
    /// 配置文件（默认 `<config_dir>/rover/config.toml`，不存在时使用默认值）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 串口设备（覆盖配置）
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 前进指定距离（cm）
    Move {
        /// 距离（cm），负数后退
        #[arg(allow_hyphen_values = true)]
        distance: i32,

        /// 开启沿墙修正
        #[arg(long)]
        correct: bool,

        /// 驶向墙，最多前进 L cm（覆盖 distance）
        #[arg(long, value_name = "L")]
        wall: Option<i32>,
    },

    /// 原地旋转（度），等待完成
    Rotate {
        #[arg(allow_hyphen_values = true)]
        degrees: i32,
    },

    /// 设置机械手角度（度）
    Hand { degrees: i32 },

    /// 夹爪开合
    Grabber {
        #[arg(value_enum)]
        action: GrabberArg,
    },

    /// 切换测距仪朝向
    Rangefinder {
        #[arg(value_enum)]
        direction: RangefinderArg,

        /// 即使已在该朝向也重新下发
        #[arg(long)]
        force: bool,
    },

    /// 指示灯开关
    Led {
        #[arg(value_enum)]
        color: LedArg,
        #[arg(value_enum)]
        state: SwitchArg,
    },

    /// 指示灯闪烁周期（ms）
    LedPeriod { millis: u32 },

    /// 照明开关
    Light {
        #[arg(value_enum)]
        state: SwitchArg,
    },

    /// 重置位置
    Reset,

    /// 监控遥测（Ctrl+C 退出）
    Monitor {
        /// 刷新频率（Hz）
        #[arg(long, default_value_t = 10)]
        hz: u32,
    },
}

fn main() -> Result<()> {
    // 初始化日志（RUST_LOG 优先）
    rover_sdk::init_logger();

    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref(), cli.device.as_deref())?;

    commands::run(config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rover-cli").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_move() {
        let cli = parse(&["--device", "/dev/ttyUSB0", "move", "50", "--correct"]);
        assert_eq!(cli.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(
            cli.command,
            Commands::Move {
                distance: 50,
                correct: true,
                wall: None
            }
        );
    }

    #[test]
    fn test_parse_negative_values() {
        let cli = parse(&["move", "-20"]);
        assert_eq!(
            cli.command,
            Commands::Move {
                distance: -20,
                correct: false,
                wall: None
            }
        );

        let cli = parse(&["rotate", "-90"]);
        assert_eq!(cli.command, Commands::Rotate { degrees: -90 });
    }

    #[test]
    fn test_parse_wall() {
        let cli = parse(&["move", "0", "--wall", "200"]);
        assert_eq!(
            cli.command,
            Commands::Move {
                distance: 0,
                correct: false,
                wall: Some(200)
            }
        );
    }

    #[test]
    fn test_parse_accessories() {
        assert_eq!(
            parse(&["led", "red", "on"]).command,
            Commands::Led {
                color: LedArg::Red,
                state: SwitchArg::On
            }
        );
        assert_eq!(
            parse(&["rangefinder", "right", "--force"]).command,
            Commands::Rangefinder {
                direction: RangefinderArg::Right,
                force: true
            }
        );
        assert_eq!(
            parse(&["grabber", "close"]).command,
            Commands::Grabber {
                action: GrabberArg::Close
            }
        );
        assert_eq!(parse(&["led-period", "500"]).command, Commands::LedPeriod { millis: 500 });
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["monitor", "--hz", "5", "--config", "/tmp/rover.toml"]);
        assert_eq!(cli.command, Commands::Monitor { hz: 5 });
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rover.toml")));
    }

    #[test]
    fn test_invalid_switch_rejected() {
        let result = Cli::try_parse_from(["rover-cli", "light", "maybe"]);
        assert!(result.is_err());
    }
}
