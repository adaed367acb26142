//! 配置解析
//!
//! 优先级：`--device` > 配置文件 > 默认值

use anyhow::{Context, Result};
use rover_sdk::client::RobotConfig;
use std::path::{Path, PathBuf};

/// 默认配置文件路径：`<config_dir>/rover/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("rover");
    path.push("config.toml");
    Some(path)
}

/// 加载配置并应用命令行覆盖
///
/// 显式指定的文件必须存在；默认路径不存在时使用默认配置。
pub fn resolve(explicit: Option<&Path>, device: Option<&str>) -> Result<RobotConfig> {
    let mut config = match explicit {
        Some(path) => RobotConfig::load(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?,
        None => match default_config_file() {
            Some(path) if path.exists() => RobotConfig::load(&path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?,
            _ => RobotConfig::default(),
        },
    };

    if let Some(device) = device {
        config.driver.serial.path = device.to_string();
    }

    if config.driver.serial.path.is_empty() {
        anyhow::bail!("未指定串口设备，请使用 --device 或在配置文件中设置 [driver.serial] path");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_file_with_device_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[driver.serial]\npath = \"/dev/ttyACM0\"\nbaud_rate = 57600\n\n[motion]\nfollow_distance = 20.0"
        )
        .unwrap();

        let config = resolve(Some(file.path()), None).unwrap();
        assert_eq!(config.driver.serial.path, "/dev/ttyACM0");
        assert_eq!(config.driver.serial.baud_rate, 57600);
        assert_eq!(config.motion.follow_distance, 20.0);

        let config = resolve(Some(file.path()), Some("/dev/ttyUSB1")).unwrap();
        assert_eq!(config.driver.serial.path, "/dev/ttyUSB1");
        assert_eq!(config.driver.serial.baud_rate, 57600);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve(Some(&dir.path().join("missing.toml")), Some("/dev/ttyUSB0"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_file_path() {
        if let Some(path) = default_config_file() {
            assert!(path.ends_with("rover/config.toml"));
        }
    }
}
