//! 基于 `serialport` 的串口行适配器
//!
//! ## 特性
//!
//! - 8N1、无流控（与固件一致）
//! - 读超时可配置，超时返回 `Ok(None)` 而不是错误
//! - 半行数据跨调用保留，`\r\n` 与 `\n` 均视为行结束
//!
//! ## 限制
//!
//! - **权限要求**：Linux 下可能需要 `dialout` 组权限

use crate::{Connector, LineAdapter, SerialError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 单行最大长度，超过后丢弃缓存（线路噪声保护）
const MAX_LINE_LEN: usize = 4096;

/// 行缓冲区
///
/// 把任意切分的字节块重组为完整的行。
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加收到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_LINE_LEN && !self.pending.contains(&b'\n') {
            warn!(
                "Line buffer exceeded {} bytes without terminator, discarding",
                MAX_LINE_LEN
            );
            self.pending.clear();
        }
    }

    /// 取出下一条完整的行（不含行结束符）
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// 缓存中未成行的字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// 串口行适配器
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
    path: String,
    buffer: LineBuffer,
}

impl SerialPortAdapter {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 "/dev/ttyAMA0"）
    /// - `baud_rate`: 波特率（固件使用 115200）
    /// - `read_timeout`: 单次读超时
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            path: path.to_string(),
            buffer: LineBuffer::new(),
        })
    }

    /// 设备路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl LineAdapter for SerialPortAdapter {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SerialError> {
        if let Some(line) = self.buffer.next_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; 256];
        match self.port.read(&mut chunk) {
            Ok(0) => Err(SerialError::Closed),
            Ok(n) => {
                self.buffer.push(&chunk[..n]);
                Ok(self.buffer.next_line())
            },
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.port.set_timeout(timeout) {
            warn!("Failed to set read timeout on {}: {}", self.path, e);
        }
    }
}

/// 串口连接工厂
#[derive(Debug, Clone)]
pub struct SerialPortConnector {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialPortConnector {
    pub fn new(path: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout,
        }
    }
}

impl Connector for SerialPortConnector {
    type Adapter = SerialPortAdapter;

    fn connect(&mut self) -> Result<Self::Adapter, SerialError> {
        debug!("Connecting to serial port {}", self.path);
        SerialPortAdapter::open(&self.path, self.baud_rate, self.read_timeout)
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}
